//! Resource Schemas
//!
//! Attribute definitions for each resource type, plus the generic machinery
//! that validates a configuration against them and plans a change.

use std::fmt;

use alinas_common::{FileSystemType, RwAccessType, UserAccessType};
use ipnetwork::IpNetwork;
use serde::Serialize;

use crate::state::{bool_value, int_value, string_value, DynamicValue};

pub const ACCESS_RULE_TYPE: &str = "alicloud_nas_access_rule";
pub const SMB_ACL_ATTACHMENT_TYPE: &str = "alicloud_nas_smb_acl_attachment";

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrType {
    String,
    Int,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IpVersion {
    V4,
    V6,
}

/// Constraint checked on a configured value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    OneOf(&'static [&'static str]),
    IntBetween(i64, i64),
    StringLenBetween(usize, usize),
    Cidr(IpVersion),
}

impl Validator {
    /// Check a value, returning the reason it is rejected
    fn check(&self, value: &DynamicValue) -> Option<String> {
        match (self, value) {
            (Validator::OneOf(allowed), DynamicValue::String(s)) => {
                (!allowed.contains(&s.as_str()))
                    .then(|| format!("expected one of {:?}, got {:?}", allowed, s))
            }
            (Validator::IntBetween(min, max), v) => {
                let n = v.as_i64()?;
                (n < *min || n > *max)
                    .then(|| format!("expected to be in the range ({} - {}), got {}", min, max, n))
            }
            (Validator::StringLenBetween(min, max), DynamicValue::String(s)) => {
                let len = s.chars().count();
                (len < *min || len > *max).then(|| {
                    format!("expected length to be in the range ({} - {}), got {}", min, max, len)
                })
            }
            (Validator::Cidr(version), DynamicValue::String(s)) => match s.parse::<IpNetwork>() {
                Ok(IpNetwork::V4(_)) if *version == IpVersion::V4 => None,
                Ok(IpNetwork::V6(_)) if *version == IpVersion::V6 => None,
                Ok(_) => Some(format!("expected an IP{:?} CIDR block, got {:?}", version, s)),
                Err(e) => Some(format!("invalid CIDR block {:?}: {}", s, e)),
            },
            _ => None,
        }
    }
}

/// One attribute of a resource schema
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: AttrType,
    pub description: &'static str,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DynamicValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<Validator>,
    #[serde(skip_serializing_if = "no_names")]
    pub exactly_one_of: &'static [&'static str],
}

impl Attribute {
    fn new(name: &'static str, kind: AttrType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            validator: None,
            exactly_one_of: &[],
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, AttrType::String, description)
    }

    pub fn int(name: &'static str, description: &'static str) -> Self {
        Self::new(name, AttrType::Int, description)
    }

    pub fn bool(name: &'static str, description: &'static str) -> Self {
        Self::new(name, AttrType::Bool, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default(mut self, value: DynamicValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn exactly_one_of(mut self, others: &'static [&'static str]) -> Self {
        self.exactly_one_of = others;
        self
    }

    /// Set by the remote side only
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }

    /// Null replaced by the zero value of the attribute type
    fn normalize(&self, value: Option<&DynamicValue>) -> DynamicValue {
        match (value, self.kind) {
            (Some(v), _) if !v.is_null() => v.clone(),
            (_, AttrType::String) => string_value(""),
            (_, AttrType::Int) => int_value(0),
            (_, AttrType::Bool) => bool_value(false),
        }
    }

    fn type_matches(&self, value: &DynamicValue) -> bool {
        match self.kind {
            AttrType::String => value.as_string().is_some(),
            AttrType::Int => value.as_i64().is_some(),
            AttrType::Bool => value.as_bool().is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Problem found while validating or applying a resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary, detail)
        }
    }

    pub fn at(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        match &self.attribute {
            Some(attr) => write!(f, "{}: {} ({}): {}", level, self.summary, attr, self.detail),
            None => write!(f, "{}: {}: {}", level, self.summary, self.detail),
        }
    }
}

/// What applying a plan will do to the remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    NoOp,
    Create,
    Update,
    Replace,
    Delete,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanAction::NoOp => write!(f, "no-op"),
            PlanAction::Create => write!(f, "create"),
            PlanAction::Update => write!(f, "update"),
            PlanAction::Replace => write!(f, "replace"),
            PlanAction::Delete => write!(f, "delete"),
        }
    }
}

/// Result of planning a change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedChange {
    pub action: PlanAction,
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<String>,
}

/// Schema of one resource type
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub type_name: &'static str,
    pub version: i64,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check a configuration against the schema
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diags = Vec::new();

        let map = match config {
            DynamicValue::Map(m) => m,
            DynamicValue::Null => {
                diags.push(Diagnostic::error(
                    "Missing configuration",
                    format!("{} needs a configuration object", self.type_name),
                ));
                return diags;
            }
            _ => {
                diags.push(Diagnostic::error(
                    "Invalid configuration",
                    format!("{} configuration must be an object", self.type_name),
                ));
                return diags;
            }
        };

        let mut unknown: Vec<&String> = map
            .keys()
            .filter(|k| self.attribute(k).is_none())
            .collect();
        unknown.sort();
        for key in unknown {
            diags.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!("An argument named {:?} is not expected here", key),
                )
                .at(key),
            );
        }

        for attr in &self.attributes {
            let value = map.get(attr.name).filter(|v| !v.is_null());

            match value {
                None if attr.required => diags.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument {:?} is required, but no definition was found", attr.name),
                    )
                    .at(attr.name),
                ),
                None => {}
                Some(_) if attr.is_computed_only() && attr.name != "id" => diags.push(
                    Diagnostic::error(
                        "Value for unconfigurable attribute",
                        format!("{:?} is computed by the remote API and cannot be set", attr.name),
                    )
                    .at(attr.name),
                ),
                Some(v) if !attr.type_matches(v) => diags.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!("{:?} must be a {:?}", attr.name, attr.kind),
                    )
                    .at(attr.name),
                ),
                Some(v) => {
                    if let Some(reason) = attr.validator.as_ref().and_then(|val| val.check(v)) {
                        diags.push(
                            Diagnostic::error("Invalid attribute value", reason).at(attr.name),
                        );
                    }
                }
            }

            if !attr.exactly_one_of.is_empty() {
                let group: Vec<&str> = std::iter::once(attr.name)
                    .chain(attr.exactly_one_of.iter().copied())
                    .collect();
                let set = group
                    .iter()
                    .filter(|name| is_set(map.get(**name)))
                    .count();
                if set != 1 {
                    diags.push(
                        Diagnostic::error(
                            "Invalid combination of arguments",
                            format!("exactly one of `{}` must be specified", group.join(",")),
                        )
                        .at(attr.name),
                    );
                }
            }
        }

        diags
    }

    /// Fill unset attributes that have a default
    pub fn apply_defaults(&self, config: &DynamicValue) -> DynamicValue {
        let mut out = config.clone();
        for attr in &self.attributes {
            if let Some(default) = &attr.default {
                if config.get(attr.name).map_or(true, DynamicValue::is_null) {
                    out.set(attr.name, default.clone());
                }
            }
        }
        out
    }

    /// Whether `key` differs between two states, treating null as the zero value
    pub fn has_change(&self, prior: &DynamicValue, planned: &DynamicValue, key: &str) -> bool {
        match self.attribute(key) {
            Some(attr) => attr.normalize(prior.get(key)) != attr.normalize(planned.get(key)),
            None => prior.get(key) != planned.get(key),
        }
    }

    /// Plan the change from `prior` state to the `proposed` configuration
    pub fn plan(&self, prior: &DynamicValue, proposed: &DynamicValue) -> PlannedChange {
        if proposed.is_null() {
            let action = if prior.is_null() {
                PlanAction::NoOp
            } else {
                PlanAction::Delete
            };
            return PlannedChange {
                action,
                planned_state: DynamicValue::Null,
                requires_replace: Vec::new(),
            };
        }

        let mut planned = self.apply_defaults(proposed);

        if prior.is_null() {
            self.clear_computed(&mut planned);
            return PlannedChange {
                action: PlanAction::Create,
                planned_state: planned,
                requires_replace: Vec::new(),
            };
        }

        let requires_replace: Vec<String> = self
            .attributes
            .iter()
            .filter(|a| a.force_new && self.has_change(prior, &planned, a.name))
            .map(|a| a.name.to_string())
            .collect();

        if !requires_replace.is_empty() {
            self.clear_computed(&mut planned);
            return PlannedChange {
                action: PlanAction::Replace,
                planned_state: planned,
                requires_replace,
            };
        }

        for attr in self.attributes.iter().filter(|a| a.is_computed_only()) {
            planned.set(attr.name, prior.get(attr.name).cloned().unwrap_or_default());
        }

        let changed = self
            .attributes
            .iter()
            .filter(|a| !a.is_computed_only())
            .any(|a| self.has_change(prior, &planned, a.name));

        PlannedChange {
            action: if changed {
                PlanAction::Update
            } else {
                PlanAction::NoOp
            },
            planned_state: planned,
            requires_replace,
        }
    }

    /// Copy of `state` with sensitive values masked
    pub fn redact(&self, state: &DynamicValue) -> DynamicValue {
        let mut out = state.clone();
        for attr in self.attributes.iter().filter(|a| a.sensitive) {
            if state.get(attr.name).map_or(false, |v| !v.is_null()) {
                out.set(attr.name, string_value("(sensitive)"));
            }
        }
        out
    }

    /// Computed-only attributes are unknown until the API answers
    fn clear_computed(&self, planned: &mut DynamicValue) {
        for attr in self.attributes.iter().filter(|a| a.is_computed_only()) {
            planned.set(attr.name, DynamicValue::Null);
        }
    }
}

fn no_names(names: &&'static [&'static str]) -> bool {
    names.is_empty()
}

fn is_set(value: Option<&DynamicValue>) -> bool {
    match value {
        None | Some(DynamicValue::Null) => false,
        Some(DynamicValue::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn id_attribute() -> Attribute {
    Attribute::string("id", "Composite identifier of the resource").computed()
}

/// Schema of `alicloud_nas_access_rule`
pub fn access_rule_schema() -> Schema {
    Schema {
        type_name: ACCESS_RULE_TYPE,
        version: 0,
        attributes: vec![
            id_attribute(),
            Attribute::string("access_group_name", "Name of the permission group")
                .required()
                .force_new(),
            Attribute::string("source_cidr_ip", "IPv4 address or CIDR block granted access")
                .optional()
                .validate(Validator::Cidr(IpVersion::V4)),
            Attribute::string("ipv6_source_cidr_ip", "IPv6 address or CIDR block granted access")
                .optional()
                .validate(Validator::Cidr(IpVersion::V6))
                .exactly_one_of(&["source_cidr_ip"]),
            Attribute::string("rw_access_type", "Read-write permission")
                .optional()
                .default(string_value(RwAccessType::default().as_str()))
                .validate(Validator::OneOf(RwAccessType::VALUES)),
            Attribute::string("user_access_type", "Squashing of client identities")
                .optional()
                .default(string_value(UserAccessType::default().as_str()))
                .validate(Validator::OneOf(UserAccessType::VALUES)),
            Attribute::int("priority", "Rule priority, 1 is the highest")
                .optional()
                .default(int_value(1))
                .validate(Validator::IntBetween(1, 100)),
            Attribute::string("file_system_type", "Type of file system the group belongs to")
                .optional()
                .force_new()
                .default(string_value(FileSystemType::default().as_str()))
                .validate(Validator::OneOf(FileSystemType::VALUES)),
            Attribute::string("access_rule_id", "Rule id assigned by the API").computed(),
        ],
    }
}

/// Schema of `alicloud_nas_smb_acl_attachment`
pub fn smb_acl_attachment_schema() -> Schema {
    Schema {
        type_name: SMB_ACL_ATTACHMENT_TYPE,
        version: 0,
        attributes: vec![
            id_attribute(),
            Attribute::string("file_system_id", "Id of the SMB file system")
                .required()
                .force_new(),
            Attribute::string("keytab", "Base64 encoded keytab file")
                .required()
                .sensitive(),
            Attribute::string("keytab_md5", "MD5 checksum of the keytab file").required(),
            Attribute::bool("enable_anonymous_access", "Allow anonymous access").optional(),
            Attribute::bool("encrypt_data", "Encrypt data in transit").optional(),
            Attribute::bool("reject_unencrypted_access", "Reject clients without encryption")
                .optional(),
            Attribute::string("super_admin_sid", "SID of the super administrator").optional(),
            Attribute::string("home_dir_path", "Home directory of each user")
                .optional()
                .validate(Validator::StringLenBetween(0, 32767)),
            Attribute::string("enabled", "Whether SMB ACL is enabled").computed(),
            Attribute::string("auth_method", "Authentication method").computed(),
        ],
    }
}

/// Schemas of every supported resource type
pub fn all_schemas() -> Vec<Schema> {
    vec![access_rule_schema(), smb_acl_attachment_schema()]
}
