//! Variability descriptors: the per-source model declaration.
//!
//! Catalog rows carry a JSON blob of the form
//! `{"varMethodName": "applyAgn", "pars": {...}}`. The model name maps
//! onto a fixed set of handlers; parameters stay untyped JSON values here
//! and are pulled out with the typed accessors at evaluation time.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::VarError;

/// The variability models the engine can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Model {
    RrLyrae,
    Cepheid,
    EclipsingBinary,
    Microlens,
    BhMicrolens,
    Amcvn,
    MltFlare,
    Agn,
}

impl Model {
    /// Map a descriptor's model name onto a handler. The names are the
    /// catalog wire format and are fixed; `applyMicrolensing` is a legacy
    /// alias of `applyMicrolens` seen in older catalogs.
    pub fn from_name(name: &str) -> Option<Model> {
        match name {
            "applyRRly" => Some(Model::RrLyrae),
            "applyCepheid" => Some(Model::Cepheid),
            "applyEb" => Some(Model::EclipsingBinary),
            "applyMicrolens" | "applyMicrolensing" => Some(Model::Microlens),
            "applyBHMicrolens" => Some(Model::BhMicrolens),
            "applyAmcvn" => Some(Model::Amcvn),
            "applyMLTflaring" => Some(Model::MltFlare),
            "applyAgn" => Some(Model::Agn),
            _ => None,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Model::RrLyrae => "applyRRly",
            Model::Cepheid => "applyCepheid",
            Model::EclipsingBinary => "applyEb",
            Model::Microlens => "applyMicrolens",
            Model::BhMicrolens => "applyBHMicrolens",
            Model::Amcvn => "applyAmcvn",
            Model::MltFlare => "applyMLTflaring",
            Model::Agn => "applyAgn",
        }
    }
}

#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(rename = "varMethodName")]
    method: String,
    #[serde(default)]
    pars: Map<String, Value>,
}

/// A parsed descriptor: the model plus its named parameters.
#[derive(Debug, Clone)]
pub struct VarDescriptor {
    pub model: Model,
    pub params: Map<String, Value>,
}

impl VarDescriptor {
    /// Parse a descriptor blob. The literal sentinels `None`/`none`, an
    /// empty string, and JSON `null` all mean "no variability" and yield
    /// `Ok(None)`; an unresolvable model name is an error.
    pub fn parse(text: &str) -> Result<Option<Self>, VarError> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "None" || trimmed == "none" || trimmed == "null" {
            return Ok(None);
        }
        let raw: RawDescriptor =
            serde_json::from_str(trimmed).map_err(|source| VarError::BadDescriptor {
                text: text.to_string(),
                source,
            })?;
        if raw.method == "None" || raw.method == "none" {
            return Ok(None);
        }
        let model = Model::from_name(&raw.method)
            .ok_or_else(|| VarError::UnknownModel(raw.method.clone()))?;
        Ok(Some(VarDescriptor {
            model,
            params: raw.pars,
        }))
    }

    /// Required numeric parameter.
    pub fn f64_param(&self, name: &str, object_id: i64) -> Result<f64, VarError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Err(VarError::MissingParam {
                name: name.to_string(),
                object_id,
            }),
            Some(value) => value.as_f64().ok_or(VarError::BadParam {
                name: name.to_string(),
                object_id,
                expected: "number",
            }),
        }
    }

    /// Optional numeric parameter; absent and `null` both read as `None`.
    pub fn opt_f64_param(&self, name: &str, object_id: i64) -> Result<Option<f64>, VarError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or(VarError::BadParam {
                    name: name.to_string(),
                    object_id,
                    expected: "number",
                }),
        }
    }

    /// Required string parameter.
    pub fn str_param(&self, name: &str, object_id: i64) -> Result<&str, VarError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Err(VarError::MissingParam {
                name: name.to_string(),
                object_id,
            }),
            Some(value) => value.as_str().ok_or(VarError::BadParam {
                name: name.to_string(),
                object_id,
                expected: "string",
            }),
        }
    }

    /// Required unsigned integer parameter (generator seeds).
    pub fn u64_param(&self, name: &str, object_id: i64) -> Result<u64, VarError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Err(VarError::MissingParam {
                name: name.to_string(),
                object_id,
            }),
            Some(value) => value.as_u64().ok_or(VarError::BadParam {
                name: name.to_string(),
                object_id,
                expected: "non-negative integer",
            }),
        }
    }

    /// 0/1 flag parameter; absent reads as false.
    pub fn flag_param(&self, name: &str, object_id: i64) -> Result<bool, VarError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(false),
            Some(value) => match value {
                Value::Bool(b) => Ok(*b),
                Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0) != 0.0),
                _ => Err(VarError::BadParam {
                    name: name.to_string(),
                    object_id,
                    expected: "flag",
                }),
            },
        }
    }
}
