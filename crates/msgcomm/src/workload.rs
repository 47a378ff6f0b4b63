//! Work items for the producer and consumer demo.

/// Producer numbers land in `[PRODUCER_BASE + PRODUCER_LOWER_ADD,
/// PRODUCER_BASE + PRODUCER_UPPER_ADD]`.
pub const PRODUCER_BASE: u32 = 25_000;
pub const PRODUCER_LOWER_ADD: u32 = 25_000;
pub const PRODUCER_UPPER_ADD: u32 = 50_000;

/// `base` plus a uniform draw from `lower..=upper`.
///
/// Returns `base` unchanged when the range is empty or a single value.
pub fn random_in_range(rng: &mut fastrand::Rng, base: u32, lower: u32, upper: u32) -> u32 {
    if upper <= lower {
        return base;
    }
    base.saturating_add(rng.u32(lower..=upper))
}

/// Summarise how many divisors the integers `1..k` have in total.
pub fn divisor_summary(k: u32) -> String {
    let limit = k.saturating_sub(1);
    format!(
        "Summary: The set of all positive integers up thru constant K of {limit} together \
         can each be evenly divided by {} different values.",
        divisor_count_sum(limit)
    )
}

/// Sum of d(n) for n in `1..=limit`, counting each n's divisors by trial
/// division. This is the consumer's unit of work, so it stays a real count.
fn divisor_count_sum(limit: u32) -> u64 {
    (1..=limit).map(divisor_count).sum()
}

/// Number of divisors of `n`, pairing each `d <= sqrt(n)` with `n / d`.
fn divisor_count(n: u32) -> u64 {
    let n = u64::from(n);
    let mut count = 0;
    let mut d = 1;
    while d * d <= n {
        if n % d == 0 {
            count += if d * d == n { 1 } else { 2 };
        }
        d += 1;
    }
    count
}
