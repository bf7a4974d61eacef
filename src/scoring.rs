//! Naive Bayes spam probability in fixed-point decimal arithmetic.
//!
//! Every division is rounded half-up to [`SCALE`] fractional digits;
//! multiplication and addition are exact. The result is therefore the same
//! on every platform and every run.
//!
//! ```text
//! sp  = S / (S + H)                 hp  = H / (S + H)
//! msp = Π (spam[t] + 1) / (spamTokens + 1)
//! mhp = Π (ham[t]  + 1) / (hamTokens  + 1)
//! P   = sp·msp / (sp·msp + hp·mhp)
//! ```
//!
//! Unknown tokens contribute `1 / (tokens + 1)`, which is the same formula
//! with a zero count (add-one smoothing over the label's token volume).

use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::{Result, SpamError};
use crate::model::{AggregateStats, Label};

/// Fractional digits kept by every division.
pub const SCALE: i64 = 6;

const MICROS_PER_UNIT: u32 = 1_000_000;

/// A spam probability with exactly six fractional digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probability(BigDecimal);

impl Probability {
    /// The probability in millionths (0 ..= 1_000_000).
    pub fn micros(&self) -> u32 {
        let (mantissa, _) = self.0.as_bigint_and_exponent();
        mantissa.to_u32().unwrap_or_default()
    }

    pub fn value(&self) -> f64 {
        f64::from(self.micros()) / f64::from(MICROS_PER_UNIT)
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let micros = self.micros();
        write!(
            f,
            "{}.{:06}",
            micros / MICROS_PER_UNIT,
            micros % MICROS_PER_UNIT
        )
    }
}

fn decimal(value: u64) -> BigDecimal {
    BigDecimal::new(BigInt::from(value), 0)
}

/// `numerator / denominator` rounded half-up to [`SCALE`] digits.
/// Returns `None` when the denominator is zero.
pub fn div_half_up(numerator: &BigDecimal, denominator: &BigDecimal) -> Option<BigDecimal> {
    if denominator.is_zero() {
        return None;
    }
    let (mut num, num_scale) = numerator.as_bigint_and_exponent();
    let (mut den, den_scale) = denominator.as_bigint_and_exponent();

    // n·10^-a / (d·10^-b) · 10^SCALE = n·10^(SCALE + b - a) / d
    let shift = SCALE + den_scale - num_scale;
    let ten = BigInt::from(10u8);
    if shift >= 0 {
        num *= ten.pow(shift.unsigned_abs() as u32);
    } else {
        den *= ten.pow(shift.unsigned_abs() as u32);
    }

    let negative = num.is_negative() != den.is_negative();
    let (num, den) = (num.abs(), den.abs());
    let mut quotient = &num / &den;
    let remainder = &num % &den;
    if remainder * 2u8 >= den {
        quotient += 1u8;
    }
    if negative {
        quotient = -quotient;
    }
    Some(BigDecimal::new(quotient, SCALE))
}

/// Score a token sequence against the aggregate counters.
///
/// Fails with [`SpamError::UntrainedModel`] when no message has been merged
/// and with [`SpamError::IndeterminateScore`] when both weighted likelihoods
/// round to zero.
pub fn spam_probability<I>(stats: &AggregateStats, tokens: I) -> Result<Probability>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let total_messages = stats.total_messages();
    if total_messages == 0 {
        return Err(SpamError::UntrainedModel);
    }
    let total_messages = decimal(total_messages);
    let spam_prior = div_half_up(&decimal(stats.total_spam_messages), &total_messages)
        .ok_or(SpamError::UntrainedModel)?;
    let ham_prior = div_half_up(&decimal(stats.total_ham_messages), &total_messages)
        .ok_or(SpamError::UntrainedModel)?;

    let spam_volume = decimal(stats.total_spam_tokens) + BigDecimal::one();
    let ham_volume = decimal(stats.total_ham_tokens) + BigDecimal::one();

    let mut spam_likelihood = BigDecimal::one();
    let mut ham_likelihood = BigDecimal::one();
    for token in tokens {
        let token = token.as_ref();
        spam_likelihood *= token_factor(stats, Label::Spam, token, &spam_volume);
        ham_likelihood *= token_factor(stats, Label::Ham, token, &ham_volume);
    }

    let spam_weight = &spam_prior * &spam_likelihood;
    let ham_weight = &ham_prior * &ham_likelihood;
    let evidence = &spam_weight + &ham_weight;

    div_half_up(&spam_weight, &evidence)
        .map(Probability)
        .ok_or(SpamError::IndeterminateScore)
}

fn token_factor(stats: &AggregateStats, label: Label, token: &str, volume: &BigDecimal) -> BigDecimal {
    let count = decimal(stats.token_count(label, token)) + BigDecimal::one();
    // volume >= 1, so the division is always defined
    div_half_up(&count, volume).unwrap_or_else(BigDecimal::zero)
}
