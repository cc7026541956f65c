use crate::contract::ValidationError;

pub const PARSER_NOTIFICATION_ID: &str = "Call embargoed countries parser";
pub const OBJECT_CREATED_EVENT: &str = "s3:ObjectCreated:*";

/// Bucket notification that invokes the list parser when the list file is
/// (re)written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserNotification {
    pub id: String,
    pub function_arn: String,
    pub events: Vec<String>,
    pub prefix: String,
    pub suffix: String,
}

impl ParserNotification {
    /// Filters on the stem and extension of the key's file name.
    pub fn for_list_key(
        function_arn: impl Into<String>,
        list_key: &str,
    ) -> Result<Self, ValidationError> {
        let file_name = list_file_name(list_key);
        let Some((stem, extension)) = file_name.rsplit_once('.') else {
            return Err(ValidationError::new(format!(
                "Embargo list key '{list_key}' must name a file with an extension"
            )));
        };

        Ok(Self {
            id: PARSER_NOTIFICATION_ID.to_string(),
            function_arn: function_arn.into(),
            events: vec![OBJECT_CREATED_EVENT.to_string()],
            prefix: stem.to_string(),
            suffix: extension.to_string(),
        })
    }
}

/// Last path segment of an object key; the list file is stored at the bucket
/// root under this name.
pub fn list_file_name(list_key: &str) -> &str {
    list_key.rsplit('/').next().unwrap_or(list_key)
}
