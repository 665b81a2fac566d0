//! Core types for alinas

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Separator between the parts of a composite resource id
pub const ID_SEPARATOR: char = ':';

/// Split a composite id into exactly `expected` parts
pub fn parse_resource_id(id: &str, expected: usize) -> Result<Vec<String>> {
    let parts: Vec<String> = id.split(ID_SEPARATOR).map(str::to_string).collect();
    if parts.len() != expected {
        return Err(Error::InvalidResourceId {
            id: id.to_string(),
            expected,
        });
    }
    Ok(parts)
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? } default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Accepted wire values
            pub const VALUES: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::InvalidConfig(format!(
                        "{} must be one of {:?}, got {:?}",
                        stringify!($name),
                        Self::VALUES,
                        other
                    ))),
                }
            }
        }
    };
}

string_enum! {
    /// Read-write permission granted by an access rule
    RwAccessType { ReadWrite => "RDWR", ReadOnly => "RDONLY" } default ReadWrite
}

string_enum! {
    /// Identity squashing applied to NFS clients
    UserAccessType {
        NoSquash => "no_squash",
        RootSquash => "root_squash",
        AllSquash => "all_squash",
    } default NoSquash
}

string_enum! {
    /// Kind of file system an access group belongs to
    FileSystemType { Standard => "standard", Extreme => "extreme" } default Standard
}

/// Identifier of an access rule: `<group>:<rule id>:<file system type>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRuleId {
    pub access_group_name: String,
    pub access_rule_id: String,
    pub file_system_type: String,
}

impl AccessRuleId {
    pub fn new(
        access_group_name: impl Into<String>,
        access_rule_id: impl Into<String>,
        file_system_type: impl Into<String>,
    ) -> Self {
        Self {
            access_group_name: access_group_name.into(),
            access_rule_id: access_rule_id.into(),
            file_system_type: file_system_type.into(),
        }
    }

    /// Parse an id, accepting the legacy two-part form
    ///
    /// Rules created before extreme file systems existed were stored as
    /// `<group>:<rule id>`; those belong to standard file systems. The second
    /// element of the result tells whether the id was in legacy form.
    pub fn parse_lenient(id: &str) -> Result<(Self, bool)> {
        let parts: Vec<&str> = id.split(ID_SEPARATOR).collect();
        match parts.as_slice() {
            [group, rule] => Ok((
                Self::new(*group, *rule, FileSystemType::Standard.as_str()),
                true,
            )),
            [group, rule, fs_type] => Ok((Self::new(*group, *rule, *fs_type), false)),
            _ => Err(Error::InvalidResourceId {
                id: id.to_string(),
                expected: 3,
            }),
        }
    }
}

impl FromStr for AccessRuleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = parse_resource_id(s, 3)?.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(group), Some(rule), Some(fs_type)) => Ok(Self::new(group, rule, fs_type)),
            _ => Err(Error::InvalidResourceId {
                id: s.to_string(),
                expected: 3,
            }),
        }
    }
}

impl fmt::Display for AccessRuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.access_group_name,
            self.access_rule_id,
            self.file_system_type,
            sep = ID_SEPARATOR
        )
    }
}

/// Identifier of an SMB ACL attachment: `<file system id>:<keytab>:<keytab md5>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbAclAttachmentId {
    pub file_system_id: String,
    pub keytab: String,
    pub keytab_md5: String,
}

impl SmbAclAttachmentId {
    pub fn new(
        file_system_id: impl Into<String>,
        keytab: impl Into<String>,
        keytab_md5: impl Into<String>,
    ) -> Self {
        Self {
            file_system_id: file_system_id.into(),
            keytab: keytab.into(),
            keytab_md5: keytab_md5.into(),
        }
    }
}

impl FromStr for SmbAclAttachmentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = parse_resource_id(s, 3)?.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(fs), Some(keytab), Some(md5)) => Ok(Self::new(fs, keytab, md5)),
            _ => Err(Error::InvalidResourceId {
                id: s.to_string(),
                expected: 3,
            }),
        }
    }
}

impl fmt::Display for SmbAclAttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.file_system_id,
            self.keytab,
            self.keytab_md5,
            sep = ID_SEPARATOR
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource_id_counts_parts() {
        assert_eq!(parse_resource_id("a:b:c", 3).unwrap(), vec!["a", "b", "c"]);
        assert!(matches!(
            parse_resource_id("a:b", 3),
            Err(Error::InvalidResourceId { expected: 3, .. })
        ));
    }

    #[test]
    fn test_access_rule_id_display() {
        let id = AccessRuleId::new("group-1", "7", "extreme");
        assert_eq!(id.to_string(), "group-1:7:extreme");
        assert_eq!("group-1:7:extreme".parse::<AccessRuleId>().unwrap(), id);
    }

    #[test]
    fn test_legacy_access_rule_id_defaults_to_standard() {
        let (id, legacy) = AccessRuleId::parse_lenient("group-1:7").unwrap();
        assert!(legacy);
        assert_eq!(id.file_system_type, "standard");
        assert_eq!(id.to_string(), "group-1:7:standard");

        let (_, legacy) = AccessRuleId::parse_lenient("group-1:7:extreme").unwrap();
        assert!(!legacy);
        assert!(AccessRuleId::parse_lenient("group-1").is_err());
        assert!("group-1:7".parse::<AccessRuleId>().is_err());
    }

    #[test]
    fn test_smb_acl_id() {
        let id: SmbAclAttachmentId = "31a8e4****:BQIAAABHAAEADUFMSUFEV:e3b0c442".parse().unwrap();
        assert_eq!(id.file_system_id, "31a8e4****");
        assert_eq!(id.keytab_md5, "e3b0c442");
        assert!("fs:keytab".parse::<SmbAclAttachmentId>().is_err());
    }

    #[test]
    fn test_enum_wire_values() {
        assert_eq!("RDONLY".parse::<RwAccessType>().unwrap(), RwAccessType::ReadOnly);
        assert_eq!(UserAccessType::default().to_string(), "no_squash");
        assert_eq!(FileSystemType::VALUES, &["standard", "extreme"]);
        assert!("rdwr".parse::<RwAccessType>().is_err());
        assert_eq!(
            serde_json::to_string(&UserAccessType::RootSquash).unwrap(),
            "\"root_squash\""
        );
    }
}
