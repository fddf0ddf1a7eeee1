//! Validated string newtypes.
//!
//! These types guarantee by construction that a value conforms to the wire
//! grammar, so the codec can emit them without re-checking. Construction goes
//! through `TryFrom` (or `verify` for ad-hoc checks); parsed input that was
//! already validated byte-by-byte may use `new_unchecked`.

use std::{borrow::Cow, fmt, str::from_utf8};

use abnf_core::is_alpha;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::indicators::is_tag_char;

macro_rules! impl_common {
    ($target:ident, $error:ident) => {
        impl<'a> $target<'a> {
            pub fn inner(&self) -> &str {
                self.0.as_ref()
            }

            pub fn into_inner(self) -> Cow<'a, str> {
                self.0
            }

            /// Skip validation.
            ///
            /// The caller must guarantee that `inner` passes `verify`; parsers
            /// that already checked every byte use this to avoid a second scan.
            pub fn new_unchecked<C>(inner: C) -> Self
            where
                C: Into<Cow<'a, str>>,
            {
                let inner = inner.into();

                #[cfg(debug_assertions)]
                Self::verify(inner.as_bytes()).unwrap();

                Self(inner)
            }

            pub fn to_static(&self) -> $target<'static> {
                $target(Cow::Owned(self.0.clone().into_owned()))
            }
        }

        impl<'a> TryFrom<&'a str> for $target<'a> {
            type Error = $error;

            fn try_from(value: &'a str) -> Result<Self, Self::Error> {
                Self::verify(value.as_bytes())?;

                Ok(Self(Cow::Borrowed(value)))
            }
        }

        impl<'a> TryFrom<String> for $target<'a> {
            type Error = $error;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::verify(value.as_bytes())?;

                Ok(Self(Cow::Owned(value)))
            }
        }

        impl<'a> TryFrom<&'a [u8]> for $target<'a> {
            type Error = $error;

            fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
                Self::verify(value)?;

                // Safety: `unwrap` can't panic because `verify` only accepts
                // ASCII input.
                Ok(Self(Cow::Borrowed(from_utf8(value).unwrap())))
            }
        }

        impl<'a> AsRef<str> for $target<'a> {
            fn as_ref(&self) -> &str {
                self.0.as_ref()
            }
        }

        impl<'a> fmt::Display for $target<'a> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.0.as_ref())
            }
        }
    };
}

/// An attribute tag.
///
/// Tags forbid the reserved characters, the wildcard, whitespace, and `_`
/// (RFC 2608, section 5.0); there is no escape mechanism for tags, so a tag
/// is always plain ASCII text.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AttrTag<'a>(Cow<'a, str>);

impl<'a> AttrTag<'a> {
    pub fn verify(value: impl AsRef<[u8]>) -> Result<(), AttrTagError> {
        let value = value.as_ref();

        if value.is_empty() {
            return Err(AttrTagError::Empty);
        }

        if let Some(position) = value.iter().position(|b| !b.is_ascii() || !is_tag_char(*b)) {
            return Err(AttrTagError::ByteNotAllowed {
                found: value[position],
                position,
            });
        }

        Ok(())
    }
}

impl_common!(AttrTag, AttrTagError);

#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum AttrTagError {
    #[error("must not be empty")]
    Empty,
    #[error("invalid byte b'\\x{found:02x}' at index {position}")]
    ByteNotAllowed { found: u8, position: usize },
}

/// A language tag (RFC 1766 subset used by SLP, e.g. `en` or `en-us`).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct LanguageTag<'a>(Cow<'a, str>);

impl<'a> LanguageTag<'a> {
    /// The longest form RFC 1766 allows: a primary tag and one subtag, each
    /// of up to eight letters.
    pub const MAX_LEN: usize = 17;

    pub fn verify(value: impl AsRef<[u8]>) -> Result<(), LanguageTagError> {
        let value = value.as_ref();

        if value.len() < 2 {
            return Err(LanguageTagError::TooShort);
        }

        if value.len() > Self::MAX_LEN {
            return Err(LanguageTagError::TooLong);
        }

        if !is_alpha(value[0]) {
            return Err(LanguageTagError::ByteNotAllowed {
                found: value[0],
                position: 0,
            });
        }

        if let Some(position) = value
            .iter()
            .position(|b| !(b.is_ascii_alphanumeric() || *b == b'-'))
        {
            return Err(LanguageTagError::ByteNotAllowed {
                found: value[position],
                position,
            });
        }

        Ok(())
    }
}

impl_common!(LanguageTag, LanguageTagError);

#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum LanguageTagError {
    #[error("must be at least two characters")]
    TooShort,
    #[error("must be at most seventeen characters")]
    TooLong,
    #[error("invalid byte b'\\x{found:02x}' at index {position}")]
    ByteNotAllowed { found: u8, position: usize },
}
