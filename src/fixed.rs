//! Wide signed fixed-point scalars.
//!
//! A `Fixed<LIMBS>` is a W-bit two's-complement integer (W = 64·LIMBS)
//! read with an implicit scale of 2^(W−8): the top eight bits are the
//! signed integer part, everything below the fraction.  That puts the
//! representable range just past ±128, a comfortable margin around the
//! escape-time iteration's working range, and leaves W−8 fraction bits;
//! the widest type keeps 1016 of them.
//!
//! Addition, subtraction and negation are plain carry chains.
//! Multiplication and squaring take the magnitudes, form the full
//! 2W-bit schoolbook product, round half-up at the renormalization shift
//! and reattach the sign; squaring computes each cross product once and
//! doubles.  Arithmetic wraps silently on overflow; legal renders never
//! get near the edge of the range.
//!
//! Decimal parsing and display go through `rug` (GMP), the only places
//! this type touches an allocation.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use rug::integer::Order;
use rug::{Float, Integer};

use crate::error::Result;
use crate::scalar::{invalid_literal, Scalar};

/// Limb count of the widest supported scalar (1024 bits).
const MAX_LIMBS: usize = 16;

/// Signed fixed-point value of `64 * LIMBS` bits, least significant limb
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixed<const LIMBS: usize> {
    limbs: [u64; LIMBS],
}

/// 128-bit fixed-point scalar.
pub type Fixed128 = Fixed<2>;
/// 256-bit fixed-point scalar.
pub type Fixed256 = Fixed<4>;
/// 384-bit fixed-point scalar.
pub type Fixed384 = Fixed<6>;
/// 512-bit fixed-point scalar.
pub type Fixed512 = Fixed<8>;
/// 768-bit fixed-point scalar.
pub type Fixed768 = Fixed<12>;
/// 1024-bit fixed-point scalar.
pub type Fixed1024 = Fixed<16>;

impl<const LIMBS: usize> Fixed<LIMBS> {
    /// Total width in bits.
    pub const BITS: usize = 64 * LIMBS;

    /// Fraction bits below the binary point.
    const FRAC_BITS: usize = Self::BITS - 8;

    fn is_negative(self) -> bool {
        (self.limbs[LIMBS - 1] as i64) < 0
    }

    /// Splits into absolute value and sign.
    fn magnitude(self) -> (Self, bool) {
        if self.is_negative() {
            (-self, true)
        } else {
            (self, false)
        }
    }

    fn add_ulp(self) -> Self {
        let mut limbs = [0u64; LIMBS];
        let mut carry = true;
        for k in 0..LIMBS {
            let (v, c) = self.limbs[k].overflowing_add(carry as u64);
            limbs[k] = v;
            carry = c;
        }
        Fixed { limbs }
    }

    /// Renormalizes a 2W-bit magnitude product: shift right by W−8 with
    /// round-half-up on the dropped bits.
    fn from_product(buf: &[u64]) -> Self {
        let mut limbs = [0u64; LIMBS];
        for k in 0..LIMBS {
            limbs[k] = (buf[LIMBS - 1 + k] >> 56) | (buf[LIMBS + k] << 8);
        }
        let r = Fixed { limbs };
        if (buf[LIMBS - 1] >> 55) & 1 == 1 {
            r.add_ulp()
        } else {
            r
        }
    }
}

impl<const LIMBS: usize> Add for Fixed<LIMBS> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let mut limbs = [0u64; LIMBS];
        let mut carry = false;
        for k in 0..LIMBS {
            let (v, c1) = self.limbs[k].overflowing_add(rhs.limbs[k]);
            let (v, c2) = v.overflowing_add(carry as u64);
            limbs[k] = v;
            carry = c1 | c2;
        }
        Fixed { limbs }
    }
}

impl<const LIMBS: usize> Sub for Fixed<LIMBS> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let mut limbs = [0u64; LIMBS];
        let mut borrow = false;
        for k in 0..LIMBS {
            let (v, b1) = self.limbs[k].overflowing_sub(rhs.limbs[k]);
            let (v, b2) = v.overflowing_sub(borrow as u64);
            limbs[k] = v;
            borrow = b1 | b2;
        }
        Fixed { limbs }
    }
}

impl<const LIMBS: usize> Neg for Fixed<LIMBS> {
    type Output = Self;

    fn neg(self) -> Self {
        let mut limbs = [0u64; LIMBS];
        let mut carry = true;
        for k in 0..LIMBS {
            let (v, c) = (!self.limbs[k]).overflowing_add(carry as u64);
            limbs[k] = v;
            carry = c;
        }
        Fixed { limbs }
    }
}

impl<const LIMBS: usize> Mul for Fixed<LIMBS> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let (a, sign_a) = self.magnitude();
        let (b, sign_b) = rhs.magnitude();
        let mut buf = [0u64; 2 * MAX_LIMBS];
        mul_limbs(&a.limbs, &b.limbs, &mut buf);
        let r = Self::from_product(&buf);
        if sign_a != sign_b {
            -r
        } else {
            r
        }
    }
}

/// Schoolbook product of two equal-length limb slices into `out`.
fn mul_limbs(a: &[u64], b: &[u64], out: &mut [u64]) {
    let l = a.len();
    out[..2 * l].fill(0);
    for i in 0..l {
        let mut carry = 0u128;
        for j in 0..l {
            let t = out[i + j] as u128 + a[i] as u128 * b[j] as u128 + carry;
            out[i + j] = t as u64;
            carry = t >> 64;
        }
        out[i + l] = carry as u64;
    }
}

/// Squaring: each cross product once, doubled, diagonal added last.
fn sqr_limbs(a: &[u64], out: &mut [u64]) {
    let l = a.len();
    out[..2 * l].fill(0);
    for i in 0..l {
        let mut carry = 0u128;
        for j in i + 1..l {
            let t = out[i + j] as u128 + a[i] as u128 * a[j] as u128 + carry;
            out[i + j] = t as u64;
            carry = t >> 64;
        }
        out[i + l] = carry as u64;
    }
    let mut top = 0u64;
    for v in out[..2 * l].iter_mut() {
        let next = *v >> 63;
        *v = (*v << 1) | top;
        top = next;
    }
    let mut carry = 0u64;
    for i in 0..l {
        let sq = a[i] as u128 * a[i] as u128;
        let (lo, c0) = out[2 * i].overflowing_add(sq as u64);
        let (lo, c0b) = lo.overflowing_add(carry);
        out[2 * i] = lo;
        let (hi, c1) = out[2 * i + 1].overflowing_add((sq >> 64) as u64);
        let (hi, c1b) = hi.overflowing_add(c0 as u64 + c0b as u64);
        out[2 * i + 1] = hi;
        carry = c1 as u64 + c1b as u64;
    }
}

impl<const LIMBS: usize> Scalar for Fixed<LIMBS> {
    fn from_i32(v: i32) -> Self {
        let mut limbs = [0u64; LIMBS];
        limbs[LIMBS - 1] = ((v as i64) << 56) as u64;
        Fixed { limbs }
    }

    fn from_f64(v: f64) -> Self {
        let negative = v < 0.0;
        // The top limb carries 2^-56 per unit; peel limbs off from the top.
        let mut x = v.abs() * 72_057_594_037_927_936.0;
        let mut limbs = [0u64; LIMBS];
        for k in (1..LIMBS).rev() {
            let limb = x as u64;
            limbs[k] = limb;
            x = (x - limb as f64) * 18_446_744_073_709_551_616.0;
        }
        limbs[0] = x.round() as u64;
        let r = Fixed { limbs };
        if negative {
            -r
        } else {
            r
        }
    }

    fn from_decimal(s: &str) -> Result<Self> {
        let prec = (Self::BITS + 64) as u32;
        let parsed = Float::parse(s.trim()).map_err(|_| invalid_literal(s))?;
        let v = Float::with_val(prec, parsed);
        if !v.is_finite() {
            return Err(invalid_literal(s));
        }
        let negative = v.is_sign_negative();
        let mut mag = v.abs();
        if mag > 256.0 {
            mag = Float::with_val(prec, 256.0);
        }
        // Scale, double, add one, halve, truncate: round half-up at the
        // last kept fraction bit.
        mag <<= (Self::FRAC_BITS + 1) as u32;
        mag += 1u32;
        mag >>= 1u32;
        mag.floor_mut();
        let int = match mag.to_integer() {
            Some(int) => int,
            None => return Err(invalid_literal(s)),
        };
        let mut max = Integer::from(1);
        max <<= (Self::BITS - 1) as u32;
        let clamped = if negative {
            if int > max {
                max
            } else {
                int
            }
        } else {
            max -= 1u32;
            if int > max {
                max
            } else {
                int
            }
        };
        let digits = clamped.to_digits::<u64>(Order::Lsf);
        let mut limbs = [0u64; LIMBS];
        for (dst, src) in limbs.iter_mut().zip(digits.iter()) {
            *dst = *src;
        }
        let r = Fixed { limbs };
        Ok(if negative { -r } else { r })
    }

    fn to_f64(self) -> f64 {
        let (mag, negative) = self.magnitude();
        let mut result = 0.0;
        let mut mul = 2f64.powi(-56);
        for k in (0..LIMBS).rev() {
            result += mag.limbs[k] as f64 * mul;
            mul *= 2f64.powi(-64);
        }
        if negative {
            -result
        } else {
            result
        }
    }

    fn floor_i32(self) -> i32 {
        ((self.limbs[LIMBS - 1] as i64) >> 56) as i32
    }

    fn sqr(self) -> Self {
        let (a, _) = self.magnitude();
        let mut buf = [0u64; 2 * MAX_LIMBS];
        sqr_limbs(&a.limbs, &mut buf);
        Self::from_product(&buf)
    }

    fn ge(self, bound: f64) -> bool {
        (self.limbs[LIMBS - 1] as i64) >= (bound * 72_057_594_037_927_936.0) as i64
    }
}

impl<const LIMBS: usize> fmt::Display for Fixed<LIMBS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mag, negative) = self.magnitude();
        let int = Integer::from_digits(&mag.limbs, Order::Lsf);
        let mut val = Float::with_val((Self::BITS + 64) as u32, int);
        val >>= Self::FRAC_BITS as u32;
        if negative {
            val = -val;
        }
        write!(f, "{:.*}", Self::FRAC_BITS / 3, val)
    }
}
