//! Operator-impl boilerplate for transparent integer newtypes.

#[macro_export]
macro_rules! op {
    (binary $ty:ty, $trait:ident, $fn:ident) => {
        impl std::ops::$trait for $ty {
            type Output = Self;

            fn $fn(self, rhs: Self) -> Self::Output {
                Self::from(std::ops::$trait::$fn(self.value(), rhs.value()))
            }
        }
    };
    (inplace $ty:ty, $trait:ident, $fn:ident) => {
        impl std::ops::$trait for $ty {
            fn $fn(&mut self, rhs: Self) {
                let mut value = self.value();
                std::ops::$trait::$fn(&mut value, rhs.value());
                *self = Self::from(value);
            }
        }
    };
    (unary $ty:ty, $trait:ident, $fn:ident) => {
        impl std::ops::$trait for $ty {
            type Output = Self;

            fn $fn(self) -> Self::Output {
                Self::from(std::ops::$trait::$fn(self.value()))
            }
        }
    };
}
