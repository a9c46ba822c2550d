//! File-based whitelist configuration.
//!
//! ```yaml
//! types:
//!   Critter: [Dwelling, Name]
//!   House: all
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::registry::{MemberDescriptor, RegistryBuilder, RegistryError};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WhitelistConfig {
    /// Declared type name to the members it exposes.
    #[serde(default)]
    pub types: HashMap<String, MemberSelection>,
}

impl WhitelistConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(text, ::config::FileFormat::Yaml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    All,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum MemberSelection {
    Keyword(Selection),
    Members(Vec<String>),
}

impl RegistryBuilder {
    /// Whitelist members of declared types by name. Unknown type or member
    /// names are reported by [`build`](Self::build).
    pub fn apply_config(mut self, config: &WhitelistConfig) -> Self {
        let mut type_names: Vec<&String> = config.types.keys().collect();
        type_names.sort();

        for type_name in type_names {
            let mut picked: Vec<MemberDescriptor> = Vec::new();
            let mut errors: Vec<RegistryError> = Vec::new();

            match self.catalog(type_name) {
                None => errors.push(RegistryError::UnknownType {
                    type_name: type_name.clone(),
                }),
                Some(catalog) => match &config.types[type_name] {
                    MemberSelection::Keyword(Selection::All) => {
                        picked.extend(catalog.members.iter().cloned());
                    }
                    MemberSelection::Members(names) => {
                        for name in names {
                            match catalog
                                .members
                                .iter()
                                .find(|member| member.name().eq_ignore_ascii_case(name))
                            {
                                Some(member) => picked.push(member.clone()),
                                None => errors.push(RegistryError::UnknownMember {
                                    type_name: catalog.key.name().to_string(),
                                    member: name.clone(),
                                }),
                            }
                        }
                    }
                },
            }

            for member in picked {
                self.register(member);
            }
            for error in errors {
                self.record_error(error);
            }
        }

        self
    }
}
