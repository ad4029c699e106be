use crate::config::Manifest;
use proto_sse::sse::{DataType, FunctionDefinition, FunctionType, Parameter};
use std::collections::BTreeMap;

/// Registry holds the set of function descriptors declared by the manifest.
/// It's populated once at startup and read-only for the process lifetime,
/// so concurrent calls read it without locking.
#[derive(Debug)]
pub struct Registry {
    functions: BTreeMap<i32, FunctionDefinition>,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("function {name:?} has negative id {id}")]
    NegativeId { name: String, id: i32 },
    #[error("function id {0} is declared more than once")]
    DuplicateId(i32),
    #[error("function {name:?} has unknown function type tag {tag}")]
    BadFunctionType { name: String, tag: i32 },
    #[error("function {name:?} has unknown data type tag {tag}")]
    BadDataType { name: String, tag: i32 },
}

/// Typed error returned by `resolve` for ids absent from the manifest.
#[derive(Debug, thiserror::Error)]
#[error("function id {0} is not registered")]
pub struct NotFound(pub i32);

impl Registry {
    /// Load the registry from a manifest file. Any malformed declaration is
    /// fatal: the service refuses to start with a partial registry.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        Ok(Self::from_manifest(Manifest::parse_from_json_file(path)?)?)
    }

    pub fn from_manifest(manifest: Manifest) -> Result<Self, ManifestError> {
        let mut functions = BTreeMap::new();

        for def in manifest.functions {
            if def.id < 0 {
                return Err(ManifestError::NegativeId {
                    name: def.name,
                    id: def.id,
                });
            }
            let function_type = FunctionType::try_from(def.function_type).map_err(|_| {
                ManifestError::BadFunctionType {
                    name: def.name.clone(),
                    tag: def.function_type,
                }
            })?;
            let return_type =
                DataType::try_from(def.return_type).map_err(|_| ManifestError::BadDataType {
                    name: def.name.clone(),
                    tag: def.return_type,
                })?;

            // `Params` is a BTreeMap, so parameters are already ordered by
            // name independent of their order in the manifest document.
            let params = def
                .params
                .iter()
                .map(|(name, &tag)| {
                    let data_type =
                        DataType::try_from(tag).map_err(|_| ManifestError::BadDataType {
                            name: def.name.clone(),
                            tag,
                        })?;
                    Ok(Parameter {
                        data_type: data_type as i32,
                        name: name.clone(),
                    })
                })
                .collect::<Result<Vec<_>, ManifestError>>()?;

            tracing::info!(
                name = %def.name,
                function_id = def.id,
                params = params.len(),
                "adding function to capabilities"
            );

            let descriptor = FunctionDefinition {
                name: def.name,
                function_type: function_type as i32,
                return_type: return_type as i32,
                params,
                function_id: def.id,
            };
            if functions.insert(def.id, descriptor).is_some() {
                return Err(ManifestError::DuplicateId(def.id));
            }
        }
        Ok(Self { functions })
    }

    /// All descriptors, ordered by function id, with each descriptor's
    /// parameters ordered by name. The ordering is a published contract and
    /// stable across repeated calls.
    pub fn describe(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.functions.values()
    }

    /// Resolve a function id to its descriptor.
    pub fn resolve(&self, id: i32) -> Result<&FunctionDefinition, NotFound> {
        self.functions.get(&id).ok_or(NotFound(id))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn manifest(value: serde_json::Value) -> Manifest {
        serde_json::from_value(value).unwrap()
    }

    fn fixture() -> Registry {
        Registry::from_manifest(manifest(serde_json::json!({
            "Functions": [
                {"Name": "Predict", "Id": 0, "Type": 2, "ReturnType": 1, "Params": {"b": 1, "a": 0}},
                {"Name": "Other", "Id": 1, "Type": 0, "ReturnType": 0, "Params": {}},
            ]
        })))
        .unwrap()
    }

    #[test]
    fn test_describe_orders_functions_by_id_and_params_by_name() {
        let registry = fixture();

        let functions: Vec<_> = registry.describe().collect();
        assert_eq!(functions.len(), 2);

        assert_eq!(functions[0].name, "Predict");
        assert_eq!(functions[0].function_id, 0);
        assert_eq!(functions[0].function_type(), FunctionType::Tensor);
        assert_eq!(functions[0].return_type(), DataType::Numeric);
        let params: Vec<_> = functions[0]
            .params
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(params, vec!["a", "b"]);

        assert_eq!(functions[1].name, "Other");
        assert_eq!(functions[1].function_id, 1);
        assert!(functions[1].params.is_empty());

        // Idempotent across repeated calls.
        let again: Vec<_> = registry.describe().collect();
        assert_eq!(functions, again);
    }

    #[test]
    fn test_resolve_covers_all_registered_ids() {
        let registry = fixture();

        for id in 0..2 {
            assert_eq!(registry.resolve(id).unwrap().function_id, id);
        }
        for id in 2..10 {
            let err = registry.resolve(id).unwrap_err();
            assert_eq!(err.0, id);
        }
    }

    #[test]
    fn test_duplicate_id_refuses_load() {
        let err = Registry::from_manifest(manifest(serde_json::json!({
            "Functions": [
                {"Name": "A", "Id": 3, "Type": 0, "ReturnType": 0, "Params": {}},
                {"Name": "B", "Id": 3, "Type": 0, "ReturnType": 0, "Params": {}},
            ]
        })))
        .unwrap_err();
        insta::assert_snapshot!(err, @"function id 3 is declared more than once");
    }

    #[test]
    fn test_negative_id_refuses_load() {
        let err = Registry::from_manifest(manifest(serde_json::json!({
            "Functions": [
                {"Name": "A", "Id": -1, "Type": 0, "ReturnType": 0, "Params": {}},
            ]
        })))
        .unwrap_err();
        insta::assert_snapshot!(err, @r#"function "A" has negative id -1"#);
    }

    #[test]
    fn test_unknown_type_tags_refuse_load() {
        let err = Registry::from_manifest(manifest(serde_json::json!({
            "Functions": [
                {"Name": "A", "Id": 0, "Type": 9, "ReturnType": 0, "Params": {}},
            ]
        })))
        .unwrap_err();
        assert!(matches!(err, ManifestError::BadFunctionType { tag: 9, .. }));

        let err = Registry::from_manifest(manifest(serde_json::json!({
            "Functions": [
                {"Name": "A", "Id": 0, "Type": 0, "ReturnType": 0, "Params": {"x": 7}},
            ]
        })))
        .unwrap_err();
        assert!(matches!(err, ManifestError::BadDataType { tag: 7, .. }));
    }
}
