use serde::{
    de::{Deserialize, Deserializer, Error as DeError, Visitor},
    ser::{Serialize, Serializer},
};
use smallstr::SmallString;
use std::{
    borrow::{Borrow, Cow},
    fmt,
    ops::Deref,
};

/// 云存储账户名称
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CloudName {
    inner: SmallString<[u8; 64]>,
}

/// 媒体资源公开标识符
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicId {
    inner: SmallString<[u8; 96]>,
}

macro_rules! wrap_smallstr {
    ($name:ident) => {
        impl $name {
            /// 创建名称
            #[inline]
            pub fn new(s: impl AsRef<str>) -> Self {
                Self {
                    inner: SmallString::from_str(s.as_ref()),
                }
            }

            /// 获取名称字符串
            #[inline]
            pub fn as_str(&self) -> &str {
                self.inner.as_str()
            }

            /// 转换为 `String`
            #[inline]
            pub fn into_string(self) -> String {
                self.inner.into_string()
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(s: String) -> Self {
                Self::new(&s)
            }
        }

        impl From<Cow<'_, str>> for $name {
            #[inline]
            fn from(s: Cow<'_, str>) -> Self {
                Self::new(s.as_ref())
            }
        }

        impl Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &str {
                self.inner.as_str()
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                self.inner.as_str()
            }
        }

        impl Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                self.inner.as_str()
            }
        }

        impl PartialEq<str> for $name {
            #[inline]
            fn eq(&self, other: &str) -> bool {
                self.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            #[inline]
            fn eq(&self, other: &&str) -> bool {
                self.as_str() == *other
            }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.as_str().fmt(f)
            }
        }

        impl fmt::Debug for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.as_str().fmt(f)
            }
        }

        impl Serialize for $name {
            #[inline]
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct NameVisitor;

                impl Visitor<'_> for NameVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str("a string")
                    }

                    fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
                        Ok($name::new(v))
                    }
                }

                deserializer.deserialize_str(NameVisitor)
            }
        }
    };
}

wrap_smallstr!(CloudName);
wrap_smallstr!(PublicId);
