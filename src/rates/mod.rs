//! Exchange rates: remote snapshot, on-disk cache and conversion through the
//! settlement currency.

pub mod cbr;
pub mod store;

pub use cbr::CbrRateSource;
pub use store::{CacheFile, SnapshotStore};

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};

/// Currency every rate is quoted against. Never present in a snapshot.
pub const SETTLEMENT_CURRENCY: &str = "RUB";

#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("rate request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("rate source {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("malformed rate payload: {0}")]
    Malformed(String),
    #[error("unknown currency code '{0}'")]
    UnknownCurrency(String),
    #[error("currency '{0}' has a zero rate")]
    ZeroRate(String),
    #[error("converting {amount} {from} to {to} overflows")]
    Overflow {
        amount: Decimal,
        from: String,
        to: String,
    },
}

impl RateError {
    /// The requested amount cannot be priced from the snapshot
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            RateError::UnknownCurrency(_) | RateError::ZeroRate(_) | RateError::Overflow { .. }
        )
    }

    /// No snapshot could be obtained from the rate source
    pub fn is_network(&self) -> bool {
        !self.is_lookup()
    }
}

/// `nominal` units of a currency are worth `value` settlement units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRate {
    #[serde(rename = "Value", with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(rename = "Nominal")]
    pub nominal: NonZeroU32,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Remaining fields of the published entry (`ID`, `CharCode`, `Previous`, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CurrencyRate {
    /// Settlement units per single unit of the currency
    pub fn unit_value(&self) -> Decimal {
        self.value / Decimal::from(self.nominal.get())
    }
}

pub type Rates = BTreeMap<String, CurrencyRate>;

/// Rates as fetched at a point in time. This is also the cache file layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "data")]
    pub rates: Rates,
}

impl RateSnapshot {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.timestamp < ttl
    }

    pub fn get(&self, code: &str) -> Option<&CurrencyRate> {
        self.rates.get(&normalize_code(code))
    }

    /// Convert `amount` between two currency codes through the settlement
    /// currency. Codes are case-insensitive.
    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, RateError> {
        let from = normalize_code(from);
        let to = normalize_code(to);
        let overflow = |from: &str, to: &str| RateError::Overflow {
            amount,
            from: from.to_string(),
            to: to.to_string(),
        };

        let settlement = if from == SETTLEMENT_CURRENCY {
            amount
        } else {
            amount
                .checked_mul(self.unit_value(&from)?)
                .ok_or_else(|| overflow(&from, &to))?
        };

        if to == SETTLEMENT_CURRENCY {
            return Ok(settlement);
        }
        let unit = self.unit_value(&to)?;
        if unit.is_zero() {
            return Err(RateError::ZeroRate(to));
        }
        settlement
            .checked_div(unit)
            .ok_or_else(|| overflow(&from, &to))
    }

    fn unit_value(&self, code: &str) -> Result<Decimal, RateError> {
        self.rates
            .get(code)
            .map(CurrencyRate::unit_value)
            .ok_or_else(|| RateError::UnknownCurrency(code.to_string()))
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Remote provider of the current rates
pub trait RateSource {
    fn fetch(&self) -> Result<Rates, RateError>;
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Serves rate snapshots from memory or the store while fresh and refetches
/// once they are older than the ttl.
///
/// A failed fetch is returned as an error even when a stale snapshot is
/// available. Refreshes within one process are serialised.
pub struct RateCache<S, T = CacheFile, C = SystemClock> {
    source: S,
    store: T,
    clock: C,
    ttl: Duration,
    current: Mutex<Option<Arc<RateSnapshot>>>,
}

impl<S, T, C> RateCache<S, T, C>
where
    S: RateSource,
    T: SnapshotStore,
    C: Clock,
{
    pub fn new(source: S, store: T, clock: C, ttl: Duration) -> Self {
        RateCache {
            source,
            store,
            clock,
            ttl,
            current: Mutex::new(None),
        }
    }

    pub fn get_rates(&self) -> Result<Arc<RateSnapshot>, RateError> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_none() {
            *current = self.store.load().map(Arc::new);
        }

        let now = self.clock.now();
        if let Some(snapshot) = current.as_ref().filter(|s| s.is_fresh(now, self.ttl)) {
            log::debug!("Using cached rates from {}", snapshot.timestamp);
            return Ok(Arc::clone(snapshot));
        }

        log::info!("Currency rates missing or stale, fetching");
        let rates = self.source.fetch()?;
        let snapshot = Arc::new(RateSnapshot {
            timestamp: now,
            rates,
        });
        if let Err(err) = self.store.save(&snapshot) {
            log::warn!("Failed to save currency rate cache: {}", err);
        }
        *current = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, RateError> {
        self.get_rates()?.convert(amount, from, to)
    }

    /// Settlement units per EUR
    pub fn eur_rate(&self) -> Result<Decimal, RateError> {
        self.convert(Decimal::ONE, "EUR", SETTLEMENT_CURRENCY)
    }
}

/// Parse a cache timestamp. Stamps without an offset were written in the
/// host's local time and are read in `tz`.
fn parse_timestamp<Tz: TimeZone>(s: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    // a local time skipped by a DST jump has no mapping, read it as UTC
    Some(
        tz.from_local_datetime(&naive)
            .earliest()
            .map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc)),
    )
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_timestamp(&s, &Local)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::cell::{Cell, RefCell};
    use std::io;

    pub(crate) fn rate(value: Decimal, nominal: u32) -> CurrencyRate {
        CurrencyRate {
            value,
            nominal: NonZeroU32::new(nominal).unwrap(),
            name: None,
            extra: Default::default(),
        }
    }

    pub(crate) fn sample_rates() -> Rates {
        Rates::from([
            ("EUR".to_string(), rate(dec!(100), 1)),
            ("USD".to_string(), rate(dec!(90), 1)),
            ("KRW".to_string(), rate(dec!(65), 1000)),
        ])
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    fn snapshot() -> RateSnapshot {
        RateSnapshot {
            timestamp: at(0),
            rates: sample_rates(),
        }
    }

    pub(crate) struct StubSource {
        calls: Cell<usize>,
        fail: Cell<bool>,
    }

    impl StubSource {
        fn new() -> Self {
            StubSource {
                calls: Cell::new(0),
                fail: Cell::new(false),
            }
        }
    }

    impl RateSource for StubSource {
        fn fetch(&self) -> Result<Rates, RateError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail.get() {
                return Err(RateError::Malformed("stub failure".to_string()));
            }
            Ok(sample_rates())
        }
    }

    #[derive(Default)]
    pub(crate) struct MemoryStore {
        saved: RefCell<Option<RateSnapshot>>,
        saves: Cell<usize>,
        broken: bool,
    }

    impl SnapshotStore for MemoryStore {
        fn load(&self) -> Option<RateSnapshot> {
            self.saved.borrow().clone()
        }

        fn save(&self, snapshot: &RateSnapshot) -> io::Result<()> {
            if self.broken {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.saves.set(self.saves.get() + 1);
            *self.saved.borrow_mut() = Some(snapshot.clone());
            Ok(())
        }
    }

    pub(crate) struct FixedClock(Cell<DateTime<Utc>>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
    }

    fn cache(store: MemoryStore) -> RateCache<StubSource, MemoryStore, FixedClock> {
        RateCache::new(
            StubSource::new(),
            store,
            FixedClock(Cell::new(at(0))),
            Duration::hours(6),
        )
    }

    pub(crate) type StubCache = RateCache<StubSource, MemoryStore, FixedClock>;

    /// Cache over the sample rates, or over a source that always fails
    pub(crate) fn stub_cache(fail: bool) -> StubCache {
        let cache = cache(MemoryStore::default());
        cache.source.fail.set(fail);
        cache
    }

    #[test]
    fn convert_to_settlement() {
        assert_eq!(snapshot().convert(dec!(10), "EUR", "RUB").unwrap(), dec!(1000));
        // nominal of 1000
        assert_eq!(
            snapshot().convert(dec!(20000000), "KRW", "RUB").unwrap(),
            dec!(1300000)
        );
    }

    #[test]
    fn convert_from_settlement() {
        assert_eq!(snapshot().convert(dec!(1000), "RUB", "EUR").unwrap(), dec!(10));
        assert_eq!(snapshot().convert(dec!(65), "RUB", "KRW").unwrap(), dec!(1000));
    }

    #[test]
    fn convert_between_foreign_currencies() {
        assert_eq!(snapshot().convert(dec!(9), "EUR", "USD").unwrap(), dec!(10));
    }

    #[test]
    fn convert_identity() {
        for code in ["RUB", "EUR", "USD", "KRW"] {
            assert_eq!(snapshot().convert(dec!(123.45), code, code).unwrap(), dec!(123.45));
        }
    }

    #[test]
    fn convert_round_trip() {
        let snapshot = snapshot();
        let usd = snapshot.convert(dec!(1000), "KRW", "USD").unwrap();
        let back = snapshot.convert(usd, "USD", "KRW").unwrap();
        assert!((back - dec!(1000)).abs() < dec!(0.000000001));
    }

    #[test]
    fn codes_are_case_insensitive() {
        assert_eq!(snapshot().convert(dec!(1), "eur", " rub ").unwrap(), dec!(100));
        assert!(snapshot().get("usd").is_some());
    }

    #[test]
    fn unknown_currency_is_lookup_error() {
        let err = snapshot().convert(dec!(1), "XYZ", "RUB").unwrap_err();
        assert!(matches!(err, RateError::UnknownCurrency(ref code) if code == "XYZ"));
        assert!(err.is_lookup());
        let err = snapshot().convert(dec!(1), "RUB", "ABC").unwrap_err();
        assert!(matches!(err, RateError::UnknownCurrency(ref code) if code == "ABC"));
    }

    #[test]
    fn zero_rate_cannot_be_divided() {
        let mut snapshot = snapshot();
        snapshot.rates.insert("ZZZ".to_string(), rate(dec!(0), 1));
        assert!(matches!(
            snapshot.convert(dec!(1), "RUB", "ZZZ"),
            Err(RateError::ZeroRate(_))
        ));
    }

    #[test]
    fn huge_amount_overflows_without_panic() {
        let err = snapshot().convert(Decimal::MAX, "EUR", "RUB").unwrap_err();
        assert!(matches!(err, RateError::Overflow { ref from, .. } if from == "EUR"));
        assert!(err.is_lookup());

        // tiny unit value on the target side overflows the division
        let mut snapshot = snapshot();
        snapshot
            .rates
            .insert("TNY".to_string(), rate(dec!(0.0000000001), 1));
        assert!(matches!(
            snapshot.convert(Decimal::MAX, "RUB", "TNY"),
            Err(RateError::Overflow { .. })
        ));
        // within range still converts
        assert_eq!(
            snapshot.convert(Decimal::MAX / dec!(1000), "EUR", "RUB").unwrap(),
            Decimal::MAX / dec!(1000) * dec!(100)
        );
    }

    #[test]
    fn freshness_is_strictly_less_than_ttl() {
        let snapshot = snapshot();
        let ttl = Duration::hours(6);
        assert!(snapshot.is_fresh(at(5), ttl));
        assert!(!snapshot.is_fresh(at(6), ttl));
    }

    #[test]
    fn cold_cache_fetches_and_saves() {
        let cache = cache(MemoryStore::default());
        let snapshot = cache.get_rates().unwrap();
        assert_eq!(cache.source.calls.get(), 1);
        assert_eq!(cache.store.saves.get(), 1);
        assert_eq!(snapshot.timestamp, at(0));
        assert_eq!(cache.store.saved.borrow().as_ref(), Some(&*snapshot));
    }

    #[test]
    fn fresh_cache_skips_fetch() {
        let cache = cache(MemoryStore::default());
        let first = cache.get_rates().unwrap();
        cache.clock.0.set(at(5));
        let second = cache.get_rates().unwrap();
        assert_eq!(cache.source.calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn stale_cache_refetches() {
        let cache = cache(MemoryStore::default());
        cache.get_rates().unwrap();
        cache.clock.0.set(at(7));
        let snapshot = cache.get_rates().unwrap();
        assert_eq!(cache.source.calls.get(), 2);
        assert_eq!(cache.store.saves.get(), 2);
        assert_eq!(snapshot.timestamp, at(7));
    }

    #[test]
    fn fresh_stored_snapshot_is_used_without_fetch() {
        let store = MemoryStore::default();
        *store.saved.borrow_mut() = Some(snapshot());
        let cache = cache(store);
        cache.clock.0.set(at(3));
        let rates = cache.get_rates().unwrap();
        assert_eq!(*rates, snapshot());
        assert_eq!(cache.source.calls.get(), 0);
    }

    #[test]
    fn fetch_failure_does_not_fall_back_to_stale() {
        let store = MemoryStore::default();
        *store.saved.borrow_mut() = Some(snapshot());
        let cache = cache(store);
        cache.clock.0.set(at(12));
        cache.source.fail.set(true);

        let err = cache.get_rates().unwrap_err();
        assert!(err.is_network());
        assert_eq!(cache.source.calls.get(), 1);
        // stale entry untouched
        assert_eq!(cache.store.saved.borrow().as_ref(), Some(&snapshot()));
    }

    #[test]
    fn fetch_failure_is_not_retried_within_call() {
        let cache = cache(MemoryStore::default());
        cache.source.fail.set(true);
        assert!(cache.convert(dec!(1), "EUR", "RUB").is_err());
        assert_eq!(cache.source.calls.get(), 1);
    }

    #[test]
    fn save_failure_still_returns_rates() {
        let cache = cache(MemoryStore {
            broken: true,
            ..MemoryStore::default()
        });
        let snapshot = cache.get_rates().unwrap();
        assert_eq!(snapshot.rates, sample_rates());
        // kept in memory, no second fetch
        cache.get_rates().unwrap();
        assert_eq!(cache.source.calls.get(), 1);
    }

    #[test]
    fn eur_rate_from_cache() {
        let cache = cache(MemoryStore::default());
        assert_eq!(cache.eur_rate().unwrap(), dec!(100));
    }

    #[test]
    fn snapshot_json_layout() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["timestamp"], "2025-03-01T00:00:00Z");
        assert_eq!(json["data"]["KRW"]["Value"], 65.0);
        assert_eq!(json["data"]["KRW"]["Nominal"], 1000);
    }

    #[test]
    fn reads_naive_timestamps() {
        let snapshot: RateSnapshot = serde_json::from_str(
            r#"{
                "timestamp": "2025-03-01T04:30:00.123456",
                "data": {"USD": {"ID": "R01235", "CharCode": "USD", "Nominal": 1, "Name": "US Dollar", "Value": 88.5, "Previous": 88.1}}
            }"#,
        )
        .unwrap();
        let written = Local
            .with_ymd_and_hms(2025, 3, 1, 4, 30, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(snapshot.timestamp, written + Duration::microseconds(123456));
        let usd = snapshot.get("USD").unwrap();
        assert_eq!(usd.value, dec!(88.5));
        assert_eq!(usd.name.as_deref(), Some("US Dollar"));
    }

    #[test]
    fn naive_timestamps_are_local_time() {
        let moscow = chrono::FixedOffset::east_opt(3 * 3600).unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 9, 15, 42).unwrap();
        assert_eq!(
            parse_timestamp("2025-03-01T12:15:42", &moscow),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp("2025-03-01 12:15:42", &moscow),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp("2025-03-01", &moscow),
            Some(Utc.with_ymd_and_hms(2025, 2, 28, 21, 0, 0).unwrap())
        );
        // explicit offsets ignore the local zone
        assert_eq!(
            parse_timestamp("2025-03-01T09:15:42Z", &moscow),
            Some(expected)
        );
        assert_eq!(parse_timestamp("yesterday", &moscow), None);
    }

    #[test]
    fn zero_nominal_is_rejected() {
        let result: Result<CurrencyRate, _> =
            serde_json::from_str(r#"{"Value": 10.0, "Nominal": 0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_timestamp_is_rejected() {
        let result: Result<RateSnapshot, _> =
            serde_json::from_str(r#"{"timestamp": "yesterday", "data": {}}"#);
        assert!(result.is_err());
    }
}
