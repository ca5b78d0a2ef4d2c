//! One configured direction pair: pages of a class ↔ records of a schema.
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{SerdeConfig, URL_KEY};
use crate::decode::decode_with_limits;
use crate::encode::encode_with_limits;
use crate::error::Result;
use crate::record::Record;
use crate::resolve::project_record_with_limits;
use crate::schema::Schema;
use crate::tree::{Page, PageFactory};
use crate::Limits;

/// Holds the reader schema and the settings both directions share. Cheap to
/// clone; the schema is shared.
#[derive(Debug, Clone)]
pub struct Transcoder {
    class_name: String,
    schema: Arc<Schema>,
    use_schema_evolution: bool,
    limits: Limits,
}

impl Transcoder {
    pub fn new(class_name: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self { class_name: class_name.into(), schema, use_schema_evolution: false, limits: Limits::default() }
    }

    pub fn from_config(config: &SerdeConfig) -> Result<Self> {
        config.validate()?;
        let schema = Arc::new(config.load_schema()?);
        let properties = config.registry_properties();
        info!(
            class = %config.class_name,
            subject = %config.subject(),
            evolution = config.use_schema_evolution,
            registry = properties.get(URL_KEY).map(String::as_str).unwrap_or("none"),
            "transcoder configured"
        );
        debug!(keys = ?properties.keys().collect::<Vec<_>>(), "registry client properties");
        Ok(Self::new(&config.class_name, schema).with_schema_evolution(config.use_schema_evolution))
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn with_schema_evolution(mut self, enabled: bool) -> Self {
        self.use_schema_evolution = enabled;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn class_name(&self) -> &str { &self.class_name }
    pub fn schema(&self) -> &Schema { &self.schema }
    pub fn uses_schema_evolution(&self) -> bool { self.use_schema_evolution }

    pub fn to_record(&self, page: &Page) -> Result<Record> {
        encode_with_limits(page, &self.schema, &self.limits)
    }

    /// Rebuild a page from a record written under `writer`.
    ///
    /// With schema evolution on, the record is first projected onto the
    /// configured schema and decoded under it; otherwise the writer schema
    /// alone drives the walk. Either way the root page takes the configured
    /// class name.
    pub fn to_page(&self, record: &Record, writer: &Schema, factory: &dyn PageFactory) -> Result<Page> {
        let mut page = if self.use_schema_evolution {
            let projected = project_record_with_limits(record, writer, &self.schema, &self.limits)?;
            decode_with_limits(&projected, &self.schema, factory, &self.limits)?
        } else {
            decode_with_limits(record, writer, factory, &self.limits)?
        };
        page.set_class_name(&self.class_name);
        Ok(page)
    }
}
