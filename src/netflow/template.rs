use std::collections::HashMap;
use std::net::SocketAddr;

use crate::netflow::error::Error;
use crate::netflow::v9::TemplateFieldSpec;

/// Identifies one learned schema. Template ids are only unique per exporter
/// and per source id, so both take part in the key.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct TemplateKey {
    pub exporter: SocketAddr,
    pub source_id: u32,
    pub template_id: u16,
}

/// A learned field layout. Ordinary templates have an empty scope list;
/// option templates decode their scope fields before the option fields in
/// every matching data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    scope_fields: Vec<TemplateFieldSpec>,
    fields: Vec<TemplateFieldSpec>,
    stride: usize,
}

impl Template {
    pub fn new(template_id: u16, fields: Vec<TemplateFieldSpec>) -> Result<Self, Error> {
        Self::with_scopes(template_id, vec![], fields)
    }

    pub fn with_scopes(
        template_id: u16,
        scope_fields: Vec<TemplateFieldSpec>,
        fields: Vec<TemplateFieldSpec>,
    ) -> Result<Self, Error> {
        if scope_fields.is_empty() && fields.is_empty() {
            return Err(Error::InvalidTemplate {
                template_id,
                reason: "no fields declared",
            });
        }

        let stride = scope_fields
            .iter()
            .chain(fields.iter())
            .map(|f| f.field_length as usize)
            .sum();

        if stride == 0 {
            return Err(Error::InvalidTemplate {
                template_id,
                reason: "zero record length, cannot determine record boundaries",
            });
        }

        Ok(Template {
            scope_fields,
            fields,
            stride,
        })
    }

    pub fn scope_fields(&self) -> &[TemplateFieldSpec] {
        &self.scope_fields
    }

    pub fn fields(&self) -> &[TemplateFieldSpec] {
        &self.fields
    }

    /// Bytes consumed by one record decoded with this template.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_options(&self) -> bool {
        !self.scope_fields.is_empty()
    }
}

/// Per-session template storage. Grows for the lifetime of the owning
/// `ParserState`, bounded by the number of distinct exporter/source/template
/// triples seen; there is no eviction.
#[derive(Debug, Default)]
pub struct TemplateCache {
    map: HashMap<TemplateKey, Template>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_or_replace(&mut self, key: TemplateKey, template: Template) {
        self.map.insert(key, template);
    }

    pub fn lookup(&self, key: &TemplateKey) -> Option<&Template> {
        self.map.get(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
