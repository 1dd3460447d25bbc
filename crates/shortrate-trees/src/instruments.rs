//! Instrument descriptors priced on a rate tree.
//!
//! All maturities, expiries and delivery dates are counted in tree periods.
//! Rates (coupon, strike, fixed rate) are per year and accrue over `dt`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_non_negative, ensure_positive, TreeError, TreeResult};

/// Zero-coupon bond paying `face` at `maturity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZeroCouponBond {
    /// Face value.
    pub face: f64,
    /// Maturity in periods.
    pub maturity: usize,
}

impl ZeroCouponBond {
    /// Creates a zero-coupon bond.
    #[must_use]
    pub fn new(face: f64, maturity: usize) -> Self {
        Self { face, maturity }
    }

    /// Validates the bond.
    pub fn validate(&self) -> TreeResult<()> {
        CouponBond::from(*self).validate()
    }
}

/// Bullet bond paying `face·coupon_rate·dt` every period and face at maturity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CouponBond {
    /// Face value.
    pub face: f64,
    /// Annual coupon rate (0.05 = 5%).
    pub coupon_rate: f64,
    /// Maturity in periods.
    pub maturity: usize,
}

impl CouponBond {
    /// Creates a coupon bond.
    #[must_use]
    pub fn new(face: f64, coupon_rate: f64, maturity: usize) -> Self {
        Self {
            face,
            coupon_rate,
            maturity,
        }
    }

    /// Validates the bond.
    pub fn validate(&self) -> TreeResult<()> {
        ensure_positive("face", self.face)?;
        ensure_finite("coupon_rate", self.coupon_rate)?;
        ensure_at_least_one("maturity", self.maturity)
    }

    /// Coupon paid at each date `0 < t <= maturity`.
    #[must_use]
    pub fn coupon(&self, dt: f64) -> f64 {
        self.face * self.coupon_rate * dt
    }

    /// Cash flow paid at step `t`.
    ///
    /// Nothing is paid at `t = 0`; the last date pays the final coupon
    /// together with the face value.
    #[must_use]
    pub fn cash_flow(&self, time_step: usize, dt: f64) -> f64 {
        if time_step == 0 || time_step > self.maturity {
            0.0
        } else if time_step == self.maturity {
            self.face + self.coupon(dt)
        } else {
            self.coupon(dt)
        }
    }
}

impl From<ZeroCouponBond> for CouponBond {
    fn from(zcb: ZeroCouponBond) -> Self {
        Self::new(zcb.face, 0.0, zcb.maturity)
    }
}

/// Forward contract on a coupon bond.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondForward {
    /// Underlying bond.
    pub bond: CouponBond,
    /// Delivery date in periods, `1 <= delivery < bond.maturity`.
    pub delivery: usize,
}

impl BondForward {
    /// Validates the contract.
    pub fn validate(&self) -> TreeResult<()> {
        self.bond.validate()?;
        ensure_delivery(self.delivery, self.bond.maturity)
    }
}

/// Futures contract on a coupon bond, marked to market every period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondFuture {
    /// Underlying bond.
    pub bond: CouponBond,
    /// Delivery date in periods, `1 <= delivery < bond.maturity`.
    pub delivery: usize,
}

impl BondFuture {
    /// Validates the contract.
    pub fn validate(&self) -> TreeResult<()> {
        self.bond.validate()?;
        ensure_delivery(self.delivery, self.bond.maturity)
    }
}

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Right to buy (or, for an optionlet, a caplet).
    #[default]
    Call,
    /// Right to sell (or, for an optionlet, a floorlet).
    Put,
}

impl OptionType {
    /// Intrinsic value of exercising against `strike`.
    #[must_use]
    pub fn payoff(self, underlying: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (underlying - strike).max(0.0),
            Self::Put => (strike - underlying).max(0.0),
        }
    }
}

/// When an option may be exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStyle {
    /// Only at expiry.
    #[default]
    European,
    /// At any step up to and including expiry.
    American,
}

/// Option on a coupon bond, struck against its ex-coupon value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondOption {
    /// Underlying bond.
    pub bond: CouponBond,
    /// Call or put.
    pub option_type: OptionType,
    /// Strike price, in the bond's face units.
    pub strike: f64,
    /// Expiry in periods, `expiry < bond.maturity`.
    pub expiry: usize,
    /// Exercise style.
    #[serde(default)]
    pub exercise: ExerciseStyle,
}

impl BondOption {
    /// Validates the option.
    pub fn validate(&self) -> TreeResult<()> {
        self.bond.validate()?;
        ensure_non_negative("strike", self.strike)?;
        ensure_before_maturity("expiry", self.expiry, self.bond.maturity)
    }
}

/// Single caplet (call) or floorlet (put) on the one-period short rate.
///
/// The rate fixed at `maturity - 1` is paid in arrears at `maturity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Optionlet {
    /// Notional amount.
    pub notional: f64,
    /// Strike rate.
    pub strike: f64,
    /// Payment date in periods.
    pub maturity: usize,
    /// Caplet (`Call`) or floorlet (`Put`).
    pub option_type: OptionType,
}

impl Optionlet {
    /// Creates a caplet.
    #[must_use]
    pub fn caplet(notional: f64, strike: f64, maturity: usize) -> Self {
        Self {
            notional,
            strike,
            maturity,
            option_type: OptionType::Call,
        }
    }

    /// Creates a floorlet.
    #[must_use]
    pub fn floorlet(notional: f64, strike: f64, maturity: usize) -> Self {
        Self {
            option_type: OptionType::Put,
            ..Self::caplet(notional, strike, maturity)
        }
    }

    /// Validates the optionlet.
    pub fn validate(&self) -> TreeResult<()> {
        ensure_non_negative("notional", self.notional)?;
        ensure_finite("strike", self.strike)?;
        ensure_at_least_one("maturity", self.maturity)
    }
}

/// Which leg the holder pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapSide {
    /// Pay fixed, receive the short rate.
    #[default]
    Payer,
    /// Receive fixed, pay the short rate.
    Receiver,
}

impl SwapSide {
    fn sign(self) -> f64 {
        match self {
            Self::Payer => 1.0,
            Self::Receiver => -1.0,
        }
    }
}

/// Fixed-for-floating swap on the one-period short rate, settled in arrears.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    /// Notional amount.
    pub notional: f64,
    /// Annual fixed rate.
    pub fixed_rate: f64,
    /// Last payment date in periods.
    pub maturity: usize,
    /// Payer or receiver.
    #[serde(default)]
    pub side: SwapSide,
}

impl Swap {
    /// Validates the swap.
    pub fn validate(&self) -> TreeResult<()> {
        ensure_non_negative("notional", self.notional)?;
        ensure_finite("fixed_rate", self.fixed_rate)?;
        ensure_at_least_one("maturity", self.maturity)
    }

    /// Net payment to the holder, fixed at a node with short rate `rate` and
    /// paid one period later.
    #[must_use]
    pub fn net_payment(&self, rate: f64, dt: f64) -> f64 {
        self.side.sign() * self.notional * (rate - self.fixed_rate) * dt
    }
}

/// European option to enter a swap at `expiry`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Swaption {
    /// Underlying swap, seen from the holder's side once exercised.
    pub swap: Swap,
    /// Expiry in periods, `expiry < swap.maturity`.
    pub expiry: usize,
}

impl Swaption {
    /// Validates the swaption.
    pub fn validate(&self) -> TreeResult<()> {
        self.swap.validate()?;
        ensure_before_maturity("expiry", self.expiry, self.swap.maturity)
    }
}

/// Any instrument the valuer can price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instrument {
    /// Zero-coupon bond.
    ZeroCouponBond(ZeroCouponBond),
    /// Coupon bond.
    CouponBond(CouponBond),
    /// Bond forward.
    BondForward(BondForward),
    /// Bond future.
    BondFuture(BondFuture),
    /// Option on a bond.
    BondOption(BondOption),
    /// Caplet or floorlet.
    Optionlet(Optionlet),
    /// Interest-rate swap.
    Swap(Swap),
    /// Swaption.
    Swaption(Swaption),
}

impl Instrument {
    /// Validates the instrument fields.
    pub fn validate(&self) -> TreeResult<()> {
        match self {
            Self::ZeroCouponBond(zcb) => zcb.validate(),
            Self::CouponBond(bond) => bond.validate(),
            Self::BondForward(forward) => forward.validate(),
            Self::BondFuture(future) => future.validate(),
            Self::BondOption(option) => option.validate(),
            Self::Optionlet(optionlet) => optionlet.validate(),
            Self::Swap(swap) => swap.validate(),
            Self::Swaption(swaption) => swaption.validate(),
        }
    }

    /// Number of tree periods the instrument needs.
    #[must_use]
    pub fn required_steps(&self) -> usize {
        match self {
            Self::ZeroCouponBond(zcb) => zcb.maturity,
            Self::CouponBond(bond) => bond.maturity,
            Self::BondForward(BondForward { bond, .. })
            | Self::BondFuture(BondFuture { bond, .. })
            | Self::BondOption(BondOption { bond, .. }) => bond.maturity,
            Self::Optionlet(optionlet) => optionlet.maturity,
            Self::Swap(swap) => swap.maturity,
            Self::Swaption(swaption) => swaption.swap.maturity,
        }
    }

    /// Short description for reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ZeroCouponBond(_) => "Zero-coupon bond",
            Self::CouponBond(_) => "Coupon bond",
            Self::BondForward(_) => "Bond forward",
            Self::BondFuture(_) => "Bond future",
            Self::BondOption(option) => match (option.exercise, option.option_type) {
                (ExerciseStyle::European, OptionType::Call) => "European bond call",
                (ExerciseStyle::European, OptionType::Put) => "European bond put",
                (ExerciseStyle::American, OptionType::Call) => "American bond call",
                (ExerciseStyle::American, OptionType::Put) => "American bond put",
            },
            Self::Optionlet(optionlet) => match optionlet.option_type {
                OptionType::Call => "Caplet",
                OptionType::Put => "Floorlet",
            },
            Self::Swap(swap) => match swap.side {
                SwapSide::Payer => "Payer swap",
                SwapSide::Receiver => "Receiver swap",
            },
            Self::Swaption(swaption) => match swaption.swap.side {
                SwapSide::Payer => "Payer swaption",
                SwapSide::Receiver => "Receiver swaption",
            },
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} periods)", self.kind(), self.required_steps())
    }
}

macro_rules! impl_from_for_instrument {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Instrument {
                fn from(value: $variant) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_instrument!(
    ZeroCouponBond,
    CouponBond,
    BondForward,
    BondFuture,
    BondOption,
    Optionlet,
    Swap,
    Swaption,
);

fn ensure_at_least_one(name: &'static str, periods: usize) -> TreeResult<()> {
    if periods == 0 {
        Err(TreeError::invalid_parameter(name, "must be at least 1 period"))
    } else {
        Ok(())
    }
}

fn ensure_delivery(delivery: usize, maturity: usize) -> TreeResult<()> {
    if delivery == 0 || delivery >= maturity {
        Err(TreeError::invalid_parameter(
            "delivery",
            format!("delivery {delivery} must fall strictly inside the bond's life (0, {maturity})"),
        ))
    } else {
        Ok(())
    }
}

fn ensure_before_maturity(name: &'static str, expiry: usize, maturity: usize) -> TreeResult<()> {
    if expiry >= maturity {
        Err(TreeError::invalid_parameter(
            name,
            format!("{expiry} is not before the underlying maturity {maturity}"),
        ))
    } else {
        Ok(())
    }
}
