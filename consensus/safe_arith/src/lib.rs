//! Explicit, overflow-checked arithmetic for state-transition balance/slot math.
//!
//! `spec.md` §4.3 requires "explicit saturation on subtraction below zero" and forbids silent
//! wraparound elsewhere; `SafeArith` makes every addition/multiplication/division a checked
//! operation that the caller must handle, and provides `safe_sub` variants that saturate rather
//! than underflow for the handful of places the state transition wants that behaviour (e.g.
//! slashing penalties, balance decreases).

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithError {
    Overflow,
    DivisionByZero,
}

pub trait SafeArith: Sized + Copy {
    const ZERO: Self;
    const ONE: Self;

    fn safe_add(&self, other: Self) -> Result<Self, ArithError>;
    fn safe_sub(&self, other: Self) -> Result<Self, ArithError>;
    fn safe_mul(&self, other: Self) -> Result<Self, ArithError>;
    fn safe_div(&self, other: Self) -> Result<Self, ArithError>;
    fn safe_rem(&self, other: Self) -> Result<Self, ArithError>;

    /// Subtraction that floors at zero instead of erroring, matching the spec's explicit
    /// "saturates at zero" rule for balance decreases.
    fn saturating_sub(&self, other: Self) -> Self;

    fn safe_add_assign(&mut self, other: Self) -> Result<(), ArithError> {
        *self = self.safe_add(other)?;
        Ok(())
    }

    fn safe_sub_assign(&mut self, other: Self) -> Result<(), ArithError> {
        *self = self.safe_sub(other)?;
        Ok(())
    }
}

macro_rules! impl_safe_arith {
    ($ty:ty) => {
        impl SafeArith for $ty {
            const ZERO: Self = 0;
            const ONE: Self = 1;

            fn safe_add(&self, other: Self) -> Result<Self, ArithError> {
                self.checked_add(other).ok_or(ArithError::Overflow)
            }

            fn safe_sub(&self, other: Self) -> Result<Self, ArithError> {
                self.checked_sub(other).ok_or(ArithError::Overflow)
            }

            fn safe_mul(&self, other: Self) -> Result<Self, ArithError> {
                self.checked_mul(other).ok_or(ArithError::Overflow)
            }

            fn safe_div(&self, other: Self) -> Result<Self, ArithError> {
                self.checked_div(other).ok_or(ArithError::DivisionByZero)
            }

            fn safe_rem(&self, other: Self) -> Result<Self, ArithError> {
                self.checked_rem(other).ok_or(ArithError::DivisionByZero)
            }

            fn saturating_sub(&self, other: Self) -> Self {
                (*self).saturating_sub(other)
            }
        }
    };
}

impl_safe_arith!(u64);
impl_safe_arith!(u32);
impl_safe_arith!(usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_overflow() {
        assert_eq!(u64::MAX.safe_add(1), Err(ArithError::Overflow));
    }

    #[test]
    fn sub_saturates() {
        assert_eq!(5u64.saturating_sub(10), 0);
        assert_eq!(5u64.safe_sub(10), Err(ArithError::Overflow));
    }

    #[test]
    fn div_by_zero() {
        assert_eq!(5u64.safe_div(0), Err(ArithError::DivisionByZero));
    }
}
