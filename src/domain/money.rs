//! Monetary arithmetic. Every amount is a [`BigDecimal`] held at two
//! decimal places; binary floating point never touches a balance.

use bigdecimal::BigDecimal;

pub fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

fn half() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(2)
}

/// Fallback unit price when neither the request nor the listing carries a
/// usable price.
pub fn default_single_price() -> BigDecimal {
    (BigDecimal::from(30) / BigDecimal::from(100)).with_scale(2)
}

/// Round to cents, half away from zero. Client JSON often arrives as a
/// binary float (0.3 deserializes as 0.29999...), so every externally
/// supplied amount passes through here before it is compared or stored.
pub fn round_to_cents(value: &BigDecimal) -> BigDecimal {
    let scaled = value * BigDecimal::from(100);
    let adjusted = if scaled >= zero() {
        scaled + half()
    } else {
        scaled - half()
    };
    (adjusted.with_scale(0) / BigDecimal::from(100)).with_scale(2)
}

/// Price charged for a single purchase: a positive client price wins,
/// then a positive listed price, then the default.
pub fn effective_price(requested: Option<&BigDecimal>, listed: &BigDecimal) -> BigDecimal {
    if let Some(price) = requested {
        if price > &zero() {
            return round_to_cents(price);
        }
    }
    if listed > &zero() {
        return round_to_cents(listed);
    }
    default_single_price()
}

/// Split `total` into `count` cent-precision parts that sum back to
/// `total` exactly: every part is the floored unit share except the last,
/// which absorbs the remainder. `count` must be non-zero.
pub fn split_total(total: &BigDecimal, count: usize) -> Vec<BigDecimal> {
    let unit = (total / BigDecimal::from(count as u64)).with_scale(2);
    let mut parts = vec![unit.clone(); count];
    let allocated = &unit * BigDecimal::from((count - 1) as u64);
    parts[count - 1] = (total - allocated).with_scale(2);
    parts
}
