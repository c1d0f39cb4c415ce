//! Fixed catalog of tunable metadata types and their backing tables.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{TuningError, TuningResult};

/// Relational record kinds managed through the tuning API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataType {
    Parser,
    Template,
    Regex,
    Field,
    FieldType,
    IocFieldMapping,
    ParserTemplateMapping,
    KnownHost,
}

/// Backing table and primary key of a [`MetadataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetadataDescriptor {
    pub type_name: &'static str,
    pub table: &'static str,
    pub id_field: &'static str,
}

impl MetadataType {
    /// Catalog order; the fan-out visits types in this order.
    pub const ALL: [MetadataType; 8] = [
        MetadataType::Parser,
        MetadataType::Template,
        MetadataType::Regex,
        MetadataType::Field,
        MetadataType::FieldType,
        MetadataType::IocFieldMapping,
        MetadataType::ParserTemplateMapping,
        MetadataType::KnownHost,
    ];

    pub fn token(self) -> &'static str {
        self.descriptor().type_name
    }

    pub fn descriptor(self) -> MetadataDescriptor {
        let (type_name, table, id_field) = match self {
            MetadataType::Parser => ("parser", "Parsers", "parser_id"),
            MetadataType::Template => ("template", "FieldTemplates", "template_id"),
            MetadataType::Regex => ("regex", "FieldTemplateRegex", "regex_id"),
            MetadataType::Field => ("field", "Fields", "field_id"),
            MetadataType::FieldType => ("field_type", "FieldTypes", "type_id"),
            MetadataType::IocFieldMapping => {
                ("ioc_field_mapping", "IOCItemToFieldMapping", "mapping_id")
            }
            MetadataType::ParserTemplateMapping => (
                "parser_template_mapping",
                "ParserToFieldTemplateMapping",
                "mapping_id",
            ),
            MetadataType::KnownHost => ("known_host", "KnownHosts", "host_id"),
        };
        MetadataDescriptor {
            type_name,
            table,
            id_field,
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.token() == token)
    }
}

impl fmt::Display for MetadataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// What a request targets: one concrete type, the config file, or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestedType {
    All,
    Cfg,
    Metadata(MetadataType),
}

pub const ALL_TOKEN: &str = "all";
pub const CFG_TOKEN: &str = "cfg";

impl RequestedType {
    pub fn token(self) -> &'static str {
        match self {
            RequestedType::All => ALL_TOKEN,
            RequestedType::Cfg => CFG_TOKEN,
            RequestedType::Metadata(t) => t.token(),
        }
    }

    /// Every accepted type token, pseudo-types first, then catalog order.
    pub fn tokens() -> impl Iterator<Item = &'static str> {
        [ALL_TOKEN, CFG_TOKEN]
            .into_iter()
            .chain(MetadataType::ALL.into_iter().map(MetadataType::token))
    }
}

impl FromStr for RequestedType {
    type Err = TuningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ALL_TOKEN => Ok(RequestedType::All),
            CFG_TOKEN => Ok(RequestedType::Cfg),
            other => MetadataType::from_token(other)
                .map(RequestedType::Metadata)
                .ok_or_else(|| TuningError::InvalidType(other.to_string())),
        }
    }
}

impl fmt::Display for RequestedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Look up the table and id column for a type token.
///
/// The pseudo-types `all` and `cfg` have no table and are rejected like any
/// unknown token.
pub fn describe(type_name: &str) -> TuningResult<MetadataDescriptor> {
    MetadataType::from_token(type_name)
        .map(MetadataType::descriptor)
        .ok_or_else(|| TuningError::InvalidType(type_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_a_descriptor() {
        for t in MetadataType::ALL {
            let d = describe(t.token()).unwrap();
            assert!(!d.table.is_empty());
            assert!(!d.id_field.is_empty());
            assert_eq!(d.type_name, t.token());
        }
    }

    #[test]
    fn test_describe_known_host() {
        let d = describe("known_host").unwrap();
        assert_eq!(d.table, "KnownHosts");
        assert_eq!(d.id_field, "host_id");
    }

    #[test]
    fn test_describe_rejects_unknown_and_pseudo_types() {
        for bad in ["nonexistent", "all", "cfg", "Parser", ""] {
            assert!(matches!(describe(bad), Err(TuningError::InvalidType(_))), "{bad}");
        }
    }

    #[test]
    fn test_tokens_order_is_stable() {
        let tokens: Vec<&str> = RequestedType::tokens().collect();
        assert_eq!(
            tokens,
            [
                "all",
                "cfg",
                "parser",
                "template",
                "regex",
                "field",
                "field_type",
                "ioc_field_mapping",
                "parser_template_mapping",
                "known_host",
            ]
        );
    }

    #[test]
    fn test_requested_type_parse() {
        assert_eq!("all".parse::<RequestedType>().unwrap(), RequestedType::All);
        assert_eq!("cfg".parse::<RequestedType>().unwrap(), RequestedType::Cfg);
        assert_eq!(
            "field_type".parse::<RequestedType>().unwrap(),
            RequestedType::Metadata(MetadataType::FieldType)
        );
        assert!("invalidMetadataType".parse::<RequestedType>().is_err());
    }
}
