use rust_decimal::Decimal;

/// Ordered step table with inclusive upper bounds.
///
/// Steps are scanned in ascending order and the first step whose upper bound
/// is `>=` the key wins. Keys above every bound fall through to `above`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tiers<K: 'static, V: 'static> {
    pub steps: &'static [(K, V)],
    pub above: V,
}

impl<K, V> Tiers<K, V>
where
    K: PartialOrd + Copy,
    V: Copy,
{
    pub fn select(&self, key: K) -> V {
        self.steps
            .iter()
            .find(|(upper, _)| key <= *upper)
            .map_or(self.above, |(_, value)| *value)
    }
}

/// Price tiers keyed by an amount of money
pub type PriceTiers = Tiers<Decimal, Decimal>;

/// Tiers keyed by an integer attribute (engine volume, horsepower)
pub type UnitTiers = Tiers<u32, Decimal>;

/// Rates paired with a per-cc minimum, keyed by price in EUR
pub type RateTiers = Tiers<Decimal, (Decimal, Decimal)>;
