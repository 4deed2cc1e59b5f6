//! Typed byte-array identifiers
//!
//! Addresses and 32-byte hashes get distinct wrapper types so a token address
//! can never be passed where a merkle node is expected, and vice versa.
//! Both render as `0x`-prefixed lowercase hex and (de)serialize as hex strings,
//! which is how they appear in configuration files.

/// Macro for generating zero-cost typed byte-array wrappers
///
/// ```rust
/// use types::define_typed_wrapper;
///
/// define_typed_wrapper!(
///     /// Eight-byte nonce
///     Nonce, 8
/// );
///
/// let nonce: Nonce = "0x00000000a9059cbb".parse().unwrap();
/// assert_eq!(nonce, Nonce::from_low_u64_be(0xa905_9cbb));
/// assert_eq!(nonce.to_string(), "0x00000000a9059cbb");
/// ```
#[macro_export]
macro_rules! define_typed_wrapper {
    (
        $(#[$meta:meta])*
        $name:ident, $len:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Number of bytes in this identifier
            pub const LEN: usize = $len;

            /// The all-zero identifier
            pub const ZERO: Self = Self([0u8; $len]);

            /// Create a new typed wrapper
            #[inline(always)]
            pub const fn new(inner: [u8; $len]) -> Self {
                Self(inner)
            }

            /// Extract the inner bytes by value
            #[inline(always)]
            pub const fn into_inner(self) -> [u8; $len] {
                self.0
            }

            /// Borrow the inner bytes
            #[inline(always)]
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// Right-aligned big-endian embedding of a small integer.
            ///
            /// Handy for deterministic test fixtures (`from_low_u64_be(1)`
            /// is `0x00..01`).
            pub fn from_low_u64_be(value: u64) -> Self {
                let mut bytes = [0u8; $len];
                let start = $len - 8;
                bytes[start..].copy_from_slice(&value.to_be_bytes());
                Self(bytes)
            }

            /// Parse from a hex string with or without the `0x` prefix
            pub fn from_hex(input: &str) -> Result<Self, $crate::ValidationError> {
                let stripped = input
                    .strip_prefix("0x")
                    .or_else(|| input.strip_prefix("0X"))
                    .unwrap_or(input);
                let decoded = hex::decode(stripped)
                    .map_err(|e| $crate::ValidationError::InvalidHex(e.to_string()))?;
                if decoded.len() != $len {
                    return Err($crate::ValidationError::InvalidLength {
                        expected: $len,
                        actual: decoded.len(),
                    });
                }
                let mut bytes = [0u8; $len];
                bytes.copy_from_slice(&decoded);
                Ok(Self(bytes))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl From<[u8; $len]> for $name {
            #[inline(always)]
            fn from(inner: [u8; $len]) -> Self {
                Self(inner)
            }
        }

        impl From<$name> for [u8; $len] {
            #[inline(always)]
            fn from(wrapper: $name) -> [u8; $len] {
                wrapper.0
            }
        }

        impl AsRef<[u8]> for $name {
            #[inline(always)]
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::from_hex(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

define_typed_wrapper!(
    /// Account, token, oracle or pool address (20 bytes)
    Address, 20
);

define_typed_wrapper!(
    /// Generic 32-byte hash (merkle nodes, roots)
    Hash256, 32
);
