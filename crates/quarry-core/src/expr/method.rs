//! The closed catalog of method names an expression tree may call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! methods {
    ($($variant:ident),* $(,)?) => {
        /// A method known to the compiler.
        ///
        /// Every operator a front end can emit is named here, including the
        /// ones that are permanently unsupported, so rejecting them is an
        /// exhaustive match rather than a fallback. Names outside the catalog
        /// land in [`Method::Other`].
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum Method {
            $(
                #[allow(missing_docs)]
                $variant,
            )*
            /// A method outside the catalog.
            Other(String),
        }

        impl Method {
            /// Returns the method's name.
            #[must_use]
            pub fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                    Self::Other(name) => name,
                }
            }
        }

        impl FromStr for Method {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(match s {
                    $(stringify!($variant) => Self::$variant,)*
                    other => Self::Other(other.to_string()),
                })
            }
        }
    };
}

methods! {
    // Outer operators
    Where,
    Select,
    OrderBy,
    OrderByDescending,
    ThenBy,
    ThenByDescending,
    Skip,
    Take,
    OfType,
    Distinct,
    WithIndex,
    // Element selectors
    Any,
    Count,
    LongCount,
    First,
    FirstOrDefault,
    Single,
    SingleOrDefault,
    Last,
    LastOrDefault,
    ElementAt,
    ElementAtOrDefault,
    Max,
    Min,
    // Known, never supported
    All,
    Aggregate,
    Average,
    Cast,
    Concat,
    DefaultIfEmpty,
    Except,
    GroupBy,
    GroupJoin,
    Intersect,
    Join,
    Reverse,
    SelectMany,
    SequenceEqual,
    SkipWhile,
    Sum,
    TakeWhile,
    Union,
    Zip,
    // Predicate methods
    Contains,
    ContainsAll,
    ContainsAny,
    ContainsKey,
    StartsWith,
    EndsWith,
    Equals,
    In,
    Inject,
    IsMatch,
    IsNullOrEmpty,
    IndexOf,
    IndexOfAny,
    GetType,
    // String transforms
    ToLower,
    ToUpper,
    ToLowerInvariant,
    ToUpperInvariant,
    Trim,
    TrimStart,
    TrimEnd,
}

impl Method {
    /// Returns `true` for the string methods that rewrite their receiver.
    #[must_use]
    pub const fn is_string_transform(&self) -> bool {
        matches!(
            self,
            Self::ToLower
                | Self::ToUpper
                | Self::ToLowerInvariant
                | Self::ToUpperInvariant
                | Self::Trim
                | Self::TrimStart
                | Self::TrimEnd
        )
    }
}

impl From<String> for Method {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        Method::from(s.to_string())
    }
}

impl From<Method> for String {
    fn from(m: Method) -> Self {
        m.name().to_string()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
