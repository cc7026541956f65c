//! Parsing of the embargo list document kept in the list bucket.
//!
//! ```json
//! {
//!   "embargoed-countries": [{"code": "CU"}],
//!   "embargoed-ips": [{"ips": [{"Type": "IPV4", "Value": "192.0.2.0/24"}]}]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::contract::ValidationError;
use crate::entry::{BlockEntry, BlockList};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbargoListFile {
    #[serde(rename = "embargoed-countries", default)]
    pub embargoed_countries: Vec<CountryRecord>,
    #[serde(rename = "embargoed-ips", default)]
    pub embargoed_ips: Vec<IpGroupRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountryRecord {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpGroupRecord {
    #[serde(default)]
    pub ips: Vec<IpRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpRecord {
    /// Informational only; the family is derived from `value`.
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub descriptor_type: Option<String>,
    #[serde(rename = "Value")]
    pub value: String,
}

impl EmbargoListFile {
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body)
            .map_err(|error| ValidationError::new(format!("Malformed embargo list file: {error}")))
    }

    /// Flattens the document into a block list.
    pub fn to_block_list(&self) -> Result<BlockList, ValidationError> {
        let mut list = BlockList::new();

        for (index, country) in self.embargoed_countries.iter().enumerate() {
            let code = country.code.trim();
            if code.is_empty() {
                return Err(ValidationError::new(format!(
                    "embargoed-countries[{index}] has an empty code"
                )));
            }
            list.insert(BlockEntry::country(code));
        }

        for (group_index, group) in self.embargoed_ips.iter().enumerate() {
            for (index, ip) in group.ips.iter().enumerate() {
                let value = ip.value.trim();
                if value.is_empty() {
                    return Err(ValidationError::new(format!(
                        "embargoed-ips[{group_index}].ips[{index}] has an empty Value"
                    )));
                }
                list.insert(BlockEntry::ip(value));
            }
        }

        Ok(list)
    }
}

pub fn parse_desired_list(body: &[u8]) -> Result<BlockList, ValidationError> {
    EmbargoListFile::from_slice(body)?.to_block_list()
}
