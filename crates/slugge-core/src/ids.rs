use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! branded_id {
    ($name:ident, $prefix:expr) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7()))
            }

            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

branded_id!(ProjectId, "proj");
branded_id!(DocumentId, "doc");
branded_id!(SnapshotId, "snap");
branded_id!(ClientId, "client");

impl ProjectId {
    /// Short random id used when a project is created without a slug.
    pub fn short() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex[..8].to_owned())
    }

    /// Lower-cased slug used verbatim as the project id.
    pub fn from_slug(slug: &str) -> Self {
        Self(slug.trim().to_lowercase())
    }

    /// Same id with a 4-hex suffix, for resolving slug collisions.
    pub fn with_suffix(&self) -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", self.0, &hex[..4]))
    }
}

/// Opaque bearer token for public share links.
pub fn new_share_token() -> String {
    Uuid::new_v4().simple().to_string()
}
