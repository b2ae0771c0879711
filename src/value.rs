//! Calculated values: real, complex, or invalid
//!
//! Every term evaluates to a `CalcValue`. Invalid values are data, not
//! errors: once an operand is invalid the whole expression collapses to
//! that operand, so the original failure reaches the displayed result
//! unchanged.

use crate::settings::CalcSettings;
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, LN_10, PI};

/// Why a value is invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidKind {
    /// A referenced term's value is not available yet
    TermNotReady,
    /// A real-only operation received a complex operand
    PassedComplex,
    /// The operation has no defined result for its operands
    NotANumber,
}

/// A calculated value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalcValue {
    Real(f64),
    Complex { re: f64, im: f64 },
    Invalid(InvalidKind),
}

/// Promotion of a binary operand pair: first invalid wins, any complex
/// operand lifts both to complex math.
enum Promoted {
    Invalid(CalcValue),
    Real(f64, f64),
    Complex(Cx, Cx),
}

impl CalcValue {
    pub const NOT_READY: CalcValue = CalcValue::Invalid(InvalidKind::TermNotReady);
    pub const NOT_A_NUMBER: CalcValue = CalcValue::Invalid(InvalidKind::NotANumber);
    pub const PASSED_COMPLEX: CalcValue = CalcValue::Invalid(InvalidKind::PassedComplex);

    pub fn real(v: f64) -> Self {
        CalcValue::Real(v)
    }

    pub fn complex(re: f64, im: f64) -> Self {
        CalcValue::Complex { re, im }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, CalcValue::Invalid(_))
    }

    pub fn invalid_kind(&self) -> Option<InvalidKind> {
        match self {
            CalcValue::Invalid(kind) => Some(*kind),
            _ => None,
        }
    }

    /// True only for a complex value with a nonzero imaginary part.
    /// A complex with zero imaginary part is semantically real and is
    /// accepted by real-only operations.
    pub fn is_complex(&self) -> bool {
        matches!(self, CalcValue::Complex { im, .. } if *im != 0.0)
    }

    /// The real reading of this value, if it has one
    pub fn as_real(&self) -> Option<f64> {
        match self {
            CalcValue::Real(v) => Some(*v),
            CalcValue::Complex { re, im } if *im == 0.0 => Some(*re),
            _ => None,
        }
    }

    /// Collapse `Complex { im: 0 }` back to `Real`
    pub fn normalized(self) -> Self {
        match self {
            CalcValue::Complex { re, im } if im == 0.0 => CalcValue::Real(re),
            other => other,
        }
    }

    fn promote(self, other: CalcValue) -> Promoted {
        if self.is_invalid() {
            return Promoted::Invalid(self);
        }
        if other.is_invalid() {
            return Promoted::Invalid(other);
        }
        match (self, other) {
            (CalcValue::Real(a), CalcValue::Real(b)) => Promoted::Real(a, b),
            _ => Promoted::Complex(Cx::from(self), Cx::from(other)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic
    // ═══════════════════════════════════════════════════════════════════

    pub fn add(self, other: CalcValue) -> CalcValue {
        match self.promote(other) {
            Promoted::Invalid(v) => v,
            Promoted::Real(a, b) => CalcValue::Real(a + b),
            Promoted::Complex(a, b) => a.add(b).into(),
        }
    }

    pub fn subtract(self, other: CalcValue) -> CalcValue {
        match self.promote(other) {
            Promoted::Invalid(v) => v,
            Promoted::Real(a, b) => CalcValue::Real(a - b),
            Promoted::Complex(a, b) => a.sub(b).into(),
        }
    }

    pub fn multiply(self, other: CalcValue) -> CalcValue {
        match self.promote(other) {
            Promoted::Invalid(v) => v,
            Promoted::Real(a, b) => CalcValue::Real(a * b),
            Promoted::Complex(a, b) => a.mul(b).into(),
        }
    }

    pub fn divide(self, other: CalcValue) -> CalcValue {
        match self.promote(other) {
            Promoted::Invalid(v) => v,
            Promoted::Real(a, b) => {
                if b == 0.0 {
                    CalcValue::NOT_A_NUMBER
                } else {
                    CalcValue::Real(a / b)
                }
            }
            Promoted::Complex(a, b) => {
                if b.is_zero() {
                    CalcValue::NOT_A_NUMBER
                } else {
                    a.div(b).into()
                }
            }
        }
    }

    pub fn negate(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(-v),
            CalcValue::Complex { re, im } => CalcValue::Complex { re: -re, im: -im },
            invalid => invalid,
        }
    }

    /// Power. Real base and exponent stay real where IEEE pow is defined;
    /// a negative base with a fractional exponent falls back to the
    /// principal complex power, as does any complex operand.
    pub fn pow(self, exp: CalcValue) -> CalcValue {
        match self.promote(exp) {
            Promoted::Invalid(v) => v,
            Promoted::Real(base, e) => {
                if base < 0.0 && e.fract() != 0.0 {
                    Cx::new(base, 0.0).pow(Cx::new(e, 0.0)).into()
                } else {
                    CalcValue::Real(base.powf(e))
                }
            }
            Promoted::Complex(z, w) => {
                if z.is_zero() {
                    return match (w.im == 0.0, w.re) {
                        (true, re) if re > 0.0 => CalcValue::Real(0.0),
                        (true, re) if re == 0.0 => CalcValue::Real(1.0),
                        _ => CalcValue::NOT_A_NUMBER,
                    };
                }
                z.pow(w).into()
            }
        }
    }

    /// Principal n-th root for integer n >= 1. Odd roots of negative reals
    /// stay real; even roots of negative reals go complex.
    pub fn nth_root(self, n: CalcValue) -> CalcValue {
        let n = match self.promote(n) {
            Promoted::Invalid(v) => return v,
            Promoted::Real(_, n) if n >= 1.0 && n.fract() == 0.0 => n,
            Promoted::Complex(_, w) if w.im == 0.0 && w.re >= 1.0 && w.re.fract() == 0.0 => w.re,
            _ => return CalcValue::NOT_A_NUMBER,
        };
        match self {
            CalcValue::Real(v) => {
                if v >= 0.0 {
                    CalcValue::Real(v.powf(1.0 / n))
                } else if (n as i64) % 2 == 1 {
                    CalcValue::Real(-(-v).powf(1.0 / n))
                } else {
                    Cx::new(v, 0.0).nth_root(n).into()
                }
            }
            CalcValue::Complex { .. } => Cx::from(self).nth_root(n).into(),
            invalid => invalid,
        }
    }

    pub fn sqrt(self) -> CalcValue {
        match self {
            CalcValue::Real(v) if v >= 0.0 => CalcValue::Real(v.sqrt()),
            CalcValue::Real(v) => CalcValue::Complex {
                re: 0.0,
                im: (-v).sqrt(),
            },
            CalcValue::Complex { .. } => Cx::from(self).sqrt().into(),
            invalid => invalid,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Exponential and logarithmic
    // ═══════════════════════════════════════════════════════════════════

    pub fn exp(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(v.exp()),
            CalcValue::Complex { .. } => Cx::from(self).exp().into(),
            invalid => invalid,
        }
    }

    /// Natural logarithm. Negative reals take the principal complex branch
    /// `ln|x| + iπ`.
    pub fn ln(self) -> CalcValue {
        match self {
            CalcValue::Real(v) if v > 0.0 => CalcValue::Real(v.ln()),
            CalcValue::Real(v) if v == 0.0 => CalcValue::Real(f64::NEG_INFINITY),
            CalcValue::Real(v) => CalcValue::Complex {
                re: (-v).ln(),
                im: PI,
            },
            CalcValue::Complex { .. } => {
                let z = Cx::from(self);
                if z.is_zero() {
                    CalcValue::Real(f64::NEG_INFINITY)
                } else {
                    z.ln().into()
                }
            }
            invalid => invalid,
        }
    }

    pub fn log10(self) -> CalcValue {
        self.ln().divide(CalcValue::Real(LN_10))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Trigonometric and hyperbolic
    // ═══════════════════════════════════════════════════════════════════

    pub fn sin(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(v.sin()),
            CalcValue::Complex { .. } => Cx::from(self).sin().into(),
            invalid => invalid,
        }
    }

    pub fn cos(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(v.cos()),
            CalcValue::Complex { .. } => Cx::from(self).cos().into(),
            invalid => invalid,
        }
    }

    pub fn tan(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(v.tan()),
            CalcValue::Complex { .. } => self.sin().divide(self.cos()),
            invalid => invalid,
        }
    }

    /// Arcsine. Real arguments outside [-1, 1] take the complex branch.
    pub fn asin(self) -> CalcValue {
        match self {
            CalcValue::Real(v) if (-1.0..=1.0).contains(&v) => CalcValue::Real(v.asin()),
            CalcValue::Real(_) | CalcValue::Complex { .. } => Cx::from(self).asin().into(),
            invalid => invalid,
        }
    }

    pub fn acos(self) -> CalcValue {
        match self {
            CalcValue::Real(v) if (-1.0..=1.0).contains(&v) => CalcValue::Real(v.acos()),
            CalcValue::Real(_) | CalcValue::Complex { .. } => {
                CalcValue::Real(FRAC_PI_2).subtract(Cx::from(self).asin().into())
            }
            invalid => invalid,
        }
    }

    pub fn atan(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(v.atan()),
            CalcValue::Complex { .. } => Cx::from(self).atan().into(),
            invalid => invalid,
        }
    }

    pub fn sinh(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(v.sinh()),
            CalcValue::Complex { .. } => Cx::from(self).sinh().into(),
            invalid => invalid,
        }
    }

    pub fn cosh(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(v.cosh()),
            CalcValue::Complex { .. } => Cx::from(self).cosh().into(),
            invalid => invalid,
        }
    }

    pub fn tanh(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(v.tanh()),
            CalcValue::Complex { .. } => self.sinh().divide(self.cosh()),
            invalid => invalid,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Complex structure
    // ═══════════════════════════════════════════════════════════════════

    /// Modulus for complex values, absolute value for reals. Always real.
    pub fn abs(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(v.abs()),
            CalcValue::Complex { re, im } => CalcValue::Real(re.hypot(im)),
            invalid => invalid,
        }
    }

    pub fn conjugate(self) -> CalcValue {
        match self {
            CalcValue::Complex { re, im } => CalcValue::Complex { re, im: -im },
            other => other,
        }
    }

    pub fn re_part(self) -> CalcValue {
        match self {
            CalcValue::Real(v) => CalcValue::Real(v),
            CalcValue::Complex { re, .. } => CalcValue::Real(re),
            invalid => invalid,
        }
    }

    pub fn im_part(self) -> CalcValue {
        match self {
            CalcValue::Real(_) => CalcValue::Real(0.0),
            CalcValue::Complex { im, .. } => CalcValue::Real(im),
            invalid => invalid,
        }
    }

    pub fn hypot(self, other: CalcValue) -> CalcValue {
        match self.promote(other) {
            Promoted::Invalid(v) => v,
            Promoted::Real(a, b) => CalcValue::Real(a.hypot(b)),
            Promoted::Complex(a, b) => {
                let sum: CalcValue = a.mul(a).add(b.mul(b)).into();
                sum.sqrt()
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Real-only operations
    // ═══════════════════════════════════════════════════════════════════

    fn real_only(self) -> Result<f64, CalcValue> {
        if self.is_invalid() {
            return Err(self);
        }
        self.as_real().ok_or(CalcValue::PASSED_COMPLEX)
    }

    fn real_only_pair(self, other: CalcValue) -> Result<(f64, f64), CalcValue> {
        Ok((self.real_only()?, other.real_only()?))
    }

    pub fn ceil(self) -> CalcValue {
        match self.real_only() {
            Ok(v) => CalcValue::Real(v.ceil()),
            Err(invalid) => invalid,
        }
    }

    pub fn floor(self) -> CalcValue {
        match self.real_only() {
            Ok(v) => CalcValue::Real(v.floor()),
            Err(invalid) => invalid,
        }
    }

    pub fn signum(self) -> CalcValue {
        match self.real_only() {
            Ok(v) if v == 0.0 => CalcValue::Real(0.0),
            Ok(v) => CalcValue::Real(v.signum()),
            Err(invalid) => invalid,
        }
    }

    pub fn max(self, other: CalcValue) -> CalcValue {
        match self.real_only_pair(other) {
            Ok((a, b)) => CalcValue::Real(a.max(b)),
            Err(invalid) => invalid,
        }
    }

    pub fn min(self, other: CalcValue) -> CalcValue {
        match self.real_only_pair(other) {
            Ok((a, b)) => CalcValue::Real(a.min(b)),
            Err(invalid) => invalid,
        }
    }

    pub fn atan2(self, other: CalcValue) -> CalcValue {
        match self.real_only_pair(other) {
            Ok((y, x)) => CalcValue::Real(y.atan2(x)),
            Err(invalid) => invalid,
        }
    }

    /// Factorial of a non-negative integer; anything else has no result.
    /// Arguments past 170 overflow f64 and collapse to infinity.
    pub fn factorial(self) -> CalcValue {
        match self.real_only() {
            Ok(v) if v >= 0.0 && v.fract() == 0.0 => {
                if v > 170.0 {
                    return CalcValue::Real(f64::INFINITY);
                }
                let n = v as u64;
                CalcValue::Real((1..=n).fold(1.0, |acc, k| acc * k as f64))
            }
            Ok(_) => CalcValue::NOT_A_NUMBER,
            Err(invalid) => invalid,
        }
    }

    /// Uniform random value in [0, v)
    pub fn random(self) -> CalcValue {
        match self.real_only() {
            Ok(v) => CalcValue::Real(rand::thread_rng().gen::<f64>() * v),
            Err(invalid) => invalid,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Comparators (real-only, producing 1.0 / 0.0)
    // ═══════════════════════════════════════════════════════════════════

    fn compare(self, other: CalcValue, op: impl Fn(f64, f64) -> bool) -> CalcValue {
        match self.real_only_pair(other) {
            Ok((a, b)) => CalcValue::Real(if op(a, b) { 1.0 } else { 0.0 }),
            Err(invalid) => invalid,
        }
    }

    pub fn compare_eq(self, other: CalcValue) -> CalcValue {
        self.compare(other, |a, b| a == b)
    }

    pub fn compare_ne(self, other: CalcValue) -> CalcValue {
        self.compare(other, |a, b| a != b)
    }

    pub fn compare_gt(self, other: CalcValue) -> CalcValue {
        self.compare(other, |a, b| a > b)
    }

    pub fn compare_ge(self, other: CalcValue) -> CalcValue {
        self.compare(other, |a, b| a >= b)
    }

    pub fn compare_lt(self, other: CalcValue) -> CalcValue {
        self.compare(other, |a, b| a < b)
    }

    pub fn compare_le(self, other: CalcValue) -> CalcValue {
        self.compare(other, |a, b| a <= b)
    }

    pub fn logical_and(self, other: CalcValue) -> CalcValue {
        self.compare(other, |a, b| a != 0.0 && b != 0.0)
    }

    pub fn logical_or(self, other: CalcValue) -> CalcValue {
        self.compare(other, |a, b| a != 0.0 || b != 0.0)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Rendering
    // ═══════════════════════════════════════════════════════════════════

    /// Render for display with the document's significant digits.
    /// Invalid and non-finite values all read "NaN".
    pub fn format_result(&self, settings: &CalcSettings) -> String {
        match self.normalized() {
            CalcValue::Real(v) => format_real(v, settings.significant_digits),
            CalcValue::Complex { re, im } => format_complex(re, im, settings.significant_digits),
            CalcValue::Invalid(_) => "NaN".to_string(),
        }
    }
}

impl std::fmt::Display for CalcValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_result(&CalcSettings::default()))
    }
}

fn format_real(v: f64, significant: usize) -> String {
    if !v.is_finite() {
        return "NaN".to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let significant = significant.max(1);
    let magnitude = v.abs().log10().floor() as i32;
    if magnitude >= 15 || magnitude <= -5 {
        return format!("{:.*e}", significant - 1, v);
    }
    let decimals = (significant as i32 - 1 - magnitude).clamp(0, 17) as usize;
    let text = format!("{:.*}", decimals, v);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

fn format_complex(re: f64, im: f64, significant: usize) -> String {
    if !re.is_finite() || !im.is_finite() {
        return "NaN".to_string();
    }
    let im_text = format!("{}i", format_real(im.abs(), significant));
    let im_sign = if im < 0.0 { "-" } else { "+" };
    if re == 0.0 {
        if im < 0.0 {
            format!("-{im_text}")
        } else {
            im_text
        }
    } else {
        format!("{}{}{}", format_real(re, significant), im_sign, im_text)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Complex arithmetic kernel
// ═══════════════════════════════════════════════════════════════════════

/// Cartesian complex number backing the `CalcValue::Complex` math paths
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cx {
    re: f64,
    im: f64,
}

impl Cx {
    fn new(re: f64, im: f64) -> Self {
        Cx { re, im }
    }

    fn is_zero(self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }

    fn abs(self) -> f64 {
        self.re.hypot(self.im)
    }

    fn arg(self) -> f64 {
        self.im.atan2(self.re)
    }

    fn add(self, o: Cx) -> Cx {
        Cx::new(self.re + o.re, self.im + o.im)
    }

    fn sub(self, o: Cx) -> Cx {
        Cx::new(self.re - o.re, self.im - o.im)
    }

    fn mul(self, o: Cx) -> Cx {
        Cx::new(
            self.re * o.re - self.im * o.im,
            self.re * o.im + self.im * o.re,
        )
    }

    fn div(self, o: Cx) -> Cx {
        let denom = o.re * o.re + o.im * o.im;
        Cx::new(
            (self.re * o.re + self.im * o.im) / denom,
            (self.im * o.re - self.re * o.im) / denom,
        )
    }

    fn scale(self, k: f64) -> Cx {
        Cx::new(self.re * k, self.im * k)
    }

    fn exp(self) -> Cx {
        let r = self.re.exp();
        Cx::new(r * self.im.cos(), r * self.im.sin())
    }

    fn ln(self) -> Cx {
        Cx::new(self.abs().ln(), self.arg())
    }

    fn sqrt(self) -> Cx {
        let r = self.abs().sqrt();
        let theta = self.arg() / 2.0;
        Cx::new(r * theta.cos(), r * theta.sin())
    }

    fn nth_root(self, n: f64) -> Cx {
        let r = self.abs().powf(1.0 / n);
        let theta = self.arg() / n;
        Cx::new(r * theta.cos(), r * theta.sin())
    }

    fn pow(self, w: Cx) -> Cx {
        w.mul(self.ln()).exp()
    }

    fn sin(self) -> Cx {
        Cx::new(
            self.re.sin() * self.im.cosh(),
            self.re.cos() * self.im.sinh(),
        )
    }

    fn cos(self) -> Cx {
        Cx::new(
            self.re.cos() * self.im.cosh(),
            -self.re.sin() * self.im.sinh(),
        )
    }

    fn sinh(self) -> Cx {
        Cx::new(
            self.re.sinh() * self.im.cos(),
            self.re.cosh() * self.im.sin(),
        )
    }

    fn cosh(self) -> Cx {
        Cx::new(
            self.re.cosh() * self.im.cos(),
            self.re.sinh() * self.im.sin(),
        )
    }

    /// asin(z) = -i ln(iz + sqrt(1 - z^2))
    fn asin(self) -> Cx {
        let i = Cx::new(0.0, 1.0);
        let one = Cx::new(1.0, 0.0);
        let inner = i.mul(self).add(one.sub(self.mul(self)).sqrt());
        i.scale(-1.0).mul(inner.ln())
    }

    /// atan(z) = (i/2) (ln(1 - iz) - ln(1 + iz))
    fn atan(self) -> Cx {
        let i = Cx::new(0.0, 1.0);
        let one = Cx::new(1.0, 0.0);
        let lhs = one.sub(i.mul(self)).ln();
        let rhs = one.add(i.mul(self)).ln();
        i.scale(0.5).mul(lhs.sub(rhs))
    }
}

impl From<CalcValue> for Cx {
    fn from(v: CalcValue) -> Cx {
        match v {
            CalcValue::Real(re) => Cx::new(re, 0.0),
            CalcValue::Complex { re, im } => Cx::new(re, im),
            CalcValue::Invalid(_) => Cx::new(f64::NAN, f64::NAN),
        }
    }
}

impl From<Cx> for CalcValue {
    fn from(z: Cx) -> CalcValue {
        CalcValue::Complex { re: z.re, im: z.im }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn parts(v: CalcValue) -> (f64, f64) {
        match v {
            CalcValue::Real(re) => (re, 0.0),
            CalcValue::Complex { re, im } => (re, im),
            CalcValue::Invalid(kind) => panic!("invalid value: {kind:?}"),
        }
    }

    #[test]
    fn real_arithmetic() {
        let a = CalcValue::Real(6.0);
        let b = CalcValue::Real(4.0);
        assert_eq!(a.add(b), CalcValue::Real(10.0));
        assert_eq!(a.subtract(b), CalcValue::Real(2.0));
        assert_eq!(a.multiply(b), CalcValue::Real(24.0));
        assert_eq!(a.divide(b), CalcValue::Real(1.5));
    }

    #[test]
    fn invalid_operands_short_circuit() {
        let bad = CalcValue::NOT_READY;
        let result = bad.add(CalcValue::Real(1.0)).multiply(CalcValue::Real(2.0));
        assert_eq!(result.invalid_kind(), Some(InvalidKind::TermNotReady));

        let result = CalcValue::Real(1.0).add(CalcValue::NOT_A_NUMBER);
        assert_eq!(result.invalid_kind(), Some(InvalidKind::NotANumber));
    }

    #[test]
    fn complex_multiplication() {
        let a = CalcValue::complex(1.0, 2.0);
        let b = CalcValue::complex(3.0, 4.0);
        let (re, im) = parts(a.multiply(b));
        assert!(close(re, -5.0));
        assert!(close(im, 10.0));
    }

    #[test]
    fn division_by_zero_is_invalid() {
        assert_eq!(
            CalcValue::Real(1.0).divide(CalcValue::Real(0.0)),
            CalcValue::NOT_A_NUMBER
        );
        assert_eq!(
            CalcValue::complex(1.0, 1.0).divide(CalcValue::complex(0.0, 0.0)),
            CalcValue::NOT_A_NUMBER
        );
    }

    #[test]
    fn sqrt_of_negative_goes_complex() {
        let (re, im) = parts(CalcValue::Real(-4.0).sqrt());
        assert!(close(re, 0.0));
        assert!(close(im, 2.0));
    }

    #[test]
    fn pow_negative_base_fractional_exponent() {
        // (-8)^(1/3) principal root = 1 + sqrt(3) i
        let (re, im) = parts(CalcValue::Real(-8.0).pow(CalcValue::Real(1.0 / 3.0)));
        assert!(close(re, 1.0));
        assert!(close(im, 3.0_f64.sqrt()));
    }

    #[test]
    fn pow_negative_base_integer_exponent_stays_real() {
        assert_eq!(
            CalcValue::Real(-2.0).pow(CalcValue::Real(3.0)),
            CalcValue::Real(-8.0)
        );
    }

    #[test]
    fn odd_nth_root_of_negative_stays_real() {
        let v = CalcValue::Real(-8.0).nth_root(CalcValue::Real(3.0));
        assert_eq!(v, CalcValue::Real(-2.0));
    }

    #[test]
    fn even_nth_root_of_negative_goes_complex() {
        let v = CalcValue::Real(-16.0).nth_root(CalcValue::Real(4.0));
        assert!(v.is_complex());
    }

    #[test]
    fn nth_root_rejects_non_integer_degree() {
        let v = CalcValue::Real(8.0).nth_root(CalcValue::Real(2.5));
        assert_eq!(v.invalid_kind(), Some(InvalidKind::NotANumber));
        let v = CalcValue::Real(8.0).nth_root(CalcValue::Real(0.0));
        assert_eq!(v.invalid_kind(), Some(InvalidKind::NotANumber));
    }

    #[test]
    fn comparators_reject_complex_operands() {
        let z = CalcValue::complex(1.0, 2.0);
        let v = z.compare_gt(CalcValue::Real(0.0));
        assert_eq!(v.invalid_kind(), Some(InvalidKind::PassedComplex));
    }

    #[test]
    fn zero_imaginary_part_counts_as_real() {
        let z = CalcValue::complex(3.0, 0.0);
        assert_eq!(z.compare_gt(CalcValue::Real(2.0)), CalcValue::Real(1.0));
        assert_eq!(z.floor(), CalcValue::Real(3.0));
        assert_eq!(z.normalized(), CalcValue::Real(3.0));
    }

    #[test]
    fn ln_of_negative_real() {
        let (re, im) = parts(CalcValue::Real(-1.0).ln());
        assert!(close(re, 0.0));
        assert!(close(im, PI));
    }

    #[test]
    fn exp_ln_round_trip_on_complex() {
        let z = CalcValue::complex(0.5, -1.25);
        let (re, im) = parts(z.ln().exp());
        assert!(close(re, 0.5));
        assert!(close(im, -1.25));
    }

    #[test]
    fn asin_outside_unit_interval_goes_complex() {
        let v = CalcValue::Real(2.0).asin();
        assert!(v.is_complex());
        // sin(asin(2)) must come back to 2
        let (re, im) = parts(v.sin());
        assert!(close(re, 2.0));
        assert!(im.abs() < 1e-9);
    }

    #[test]
    fn factorial_of_integers() {
        assert_eq!(CalcValue::Real(5.0).factorial(), CalcValue::Real(120.0));
        assert_eq!(CalcValue::Real(0.0).factorial(), CalcValue::Real(1.0));
        assert_eq!(
            CalcValue::Real(2.5).factorial().invalid_kind(),
            Some(InvalidKind::NotANumber)
        );
        assert_eq!(
            CalcValue::Real(-1.0).factorial().invalid_kind(),
            Some(InvalidKind::NotANumber)
        );
    }

    #[test]
    fn random_stays_in_range() {
        for _ in 0..100 {
            let v = CalcValue::Real(10.0).random();
            let x = v.as_real().unwrap();
            assert!((0.0..10.0).contains(&x));
        }
    }

    #[test]
    fn hypot_matches_pythagoras() {
        assert_eq!(
            CalcValue::Real(3.0).hypot(CalcValue::Real(4.0)),
            CalcValue::Real(5.0)
        );
    }

    #[test]
    fn conjugate_and_parts() {
        let z = CalcValue::complex(2.0, -3.0);
        assert_eq!(z.conjugate(), CalcValue::complex(2.0, 3.0));
        assert_eq!(z.re_part(), CalcValue::Real(2.0));
        assert_eq!(z.im_part(), CalcValue::Real(-3.0));
        assert_eq!(CalcValue::Real(7.0).im_part(), CalcValue::Real(0.0));
    }

    #[test]
    fn formats_trim_insignificant_zeros() {
        let settings = CalcSettings::default();
        assert_eq!(CalcValue::Real(7.0).format_result(&settings), "7");
        assert_eq!(CalcValue::Real(0.0).format_result(&settings), "0");
        assert_eq!(
            CalcValue::Real(1.0 / 3.0).format_result(&settings),
            "0.333333"
        );
        assert_eq!(CalcValue::Real(1234.5678).format_result(&settings), "1234.57");
    }

    #[test]
    fn formats_invalid_and_nonfinite_as_nan() {
        let settings = CalcSettings::default();
        assert_eq!(CalcValue::NOT_A_NUMBER.format_result(&settings), "NaN");
        assert_eq!(CalcValue::PASSED_COMPLEX.format_result(&settings), "NaN");
        assert_eq!(CalcValue::Real(f64::NAN).format_result(&settings), "NaN");
        assert_eq!(CalcValue::Real(f64::INFINITY).format_result(&settings), "NaN");
    }

    #[test]
    fn formats_complex_values() {
        let settings = CalcSettings::default();
        assert_eq!(
            CalcValue::complex(1.0, 2.0).format_result(&settings),
            "1+2i"
        );
        assert_eq!(
            CalcValue::complex(1.0, -2.0).format_result(&settings),
            "1-2i"
        );
        assert_eq!(CalcValue::complex(0.0, 5.0).format_result(&settings), "5i");
        assert_eq!(
            CalcValue::complex(0.0, -5.0).format_result(&settings),
            "-5i"
        );
        // zero imaginary part renders as plain real
        assert_eq!(CalcValue::complex(4.0, 0.0).format_result(&settings), "4");
    }

    #[test]
    fn tiny_and_huge_magnitudes_use_scientific_notation() {
        let settings = CalcSettings::default();
        assert_eq!(
            CalcValue::Real(1.5e-7).format_result(&settings),
            "1.50000e-7"
        );
        assert_eq!(CalcValue::Real(2.0e17).format_result(&settings), "2.00000e17");
    }
}
