// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Overlay composition of manifest trees into resource documents.
//!
//! Implements the kustomize subset the manifest bundles rely on: `resources`
//! (files and nested overlay directories), legacy `bases`, strategic-merge
//! patches, and a `namespace` field. After composition every namespaced
//! resource is rewritten to the caller's target namespace.

use crate::error::{GroundworkError, Result};
use kube::api::DynamicObject;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const KUSTOMIZATION_FILE: &str = "kustomization.yaml";
const DEFAULT_OVERLAY: &str = "default";

/// Kinds that never carry a namespace
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "Namespace",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "PersistentVolume",
    "StorageClass",
    "PriorityClass",
    "APIService",
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Kustomization {
    resources: Vec<String>,
    bases: Vec<String>,
    patches_strategic_merge: Vec<String>,
    namespace: Option<String>,
}

/// Render the overlay rooted at `manifest_path` and force every namespaced
/// resource into `namespace`. Uses `manifest_path` itself when it holds a
/// kustomization.yaml, the `default` overlay otherwise.
pub fn render(manifest_path: &Path, namespace: &str) -> Result<Vec<DynamicObject>> {
    let root = overlay_root(manifest_path)?;
    let mut documents = compose(&root)?;
    for document in &mut documents {
        set_namespace(document, namespace);
    }
    documents.into_iter().map(to_dynamic).collect()
}

fn overlay_root(manifest_path: &Path) -> Result<PathBuf> {
    if manifest_path.join(KUSTOMIZATION_FILE).is_file() {
        return Ok(manifest_path.to_path_buf());
    }
    let default_root = manifest_path.join(DEFAULT_OVERLAY);
    if default_root.join(KUSTOMIZATION_FILE).is_file() {
        return Ok(default_root);
    }
    Err(GroundworkError::RenderError(format!(
        "no overlay root: neither {} nor {} contains a {}",
        manifest_path.display(),
        default_root.display(),
        KUSTOMIZATION_FILE
    )))
}

fn compose(dir: &Path) -> Result<Vec<Value>> {
    let kustomization_path = dir.join(KUSTOMIZATION_FILE);
    let text = read_file(&kustomization_path)?;
    let kustomization: Kustomization = serde_yaml::from_str(&text).map_err(|e| {
        GroundworkError::RenderError(format!("{}: {}", kustomization_path.display(), e))
    })?;

    let mut documents = Vec::new();
    for reference in kustomization.bases.iter().chain(kustomization.resources.iter()) {
        let path = dir.join(reference);
        if path.is_dir() {
            if !path.join(KUSTOMIZATION_FILE).is_file() {
                return Err(GroundworkError::RenderError(format!(
                    "base {} contains no {}",
                    path.display(),
                    KUSTOMIZATION_FILE
                )));
            }
            documents.extend(compose(&path)?);
        } else if path.is_file() {
            documents.extend(parse_documents(&read_file(&path)?, &path)?);
        } else {
            return Err(GroundworkError::RenderError(format!(
                "resource {} not found under {}",
                reference,
                dir.display()
            )));
        }
    }

    for patch_file in &kustomization.patches_strategic_merge {
        let path = dir.join(patch_file);
        for patch in parse_documents(&read_file(&path)?, &path)? {
            apply_patch(&mut documents, patch, &path)?;
        }
    }

    if let Some(namespace) = &kustomization.namespace {
        for document in &mut documents {
            set_namespace(document, namespace);
        }
    }

    Ok(documents)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| GroundworkError::RenderError(format!("{}: {}", path.display(), e)))
}

/// Parse a (possibly multi-document) YAML file, preserving document order
fn parse_documents(text: &str, source: &Path) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)
            .map_err(|e| GroundworkError::RenderError(format!("{}: {}", source.display(), e)))?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Merge a strategic-merge patch into the document with the same kind and name
fn apply_patch(documents: &mut [Value], patch: Value, source: &Path) -> Result<()> {
    let kind = patch.get("kind").and_then(Value::as_str).unwrap_or_default();
    let name = patch
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if kind.is_empty() || name.is_empty() {
        return Err(GroundworkError::RenderError(format!(
            "patch in {} is missing kind or metadata.name",
            source.display()
        )));
    }

    let target = documents.iter_mut().find(|document| {
        document.get("kind").and_then(Value::as_str) == Some(kind)
            && document.pointer("/metadata/name").and_then(Value::as_str) == Some(name)
    });
    match target {
        Some(document) => {
            merge(document, patch);
            Ok(())
        }
        None => Err(GroundworkError::RenderError(format!(
            "patch target {}/{} not found ({})",
            kind,
            name,
            source.display()
        ))),
    }
}

/// Recursive merge: objects merge per key, null deletes, everything else replaces
fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                if value.is_null() {
                    base_map.remove(&key);
                } else if let Some(existing) = base_map.get_mut(&key) {
                    merge(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

fn set_namespace(document: &mut Value, namespace: &str) {
    let kind = document.get("kind").and_then(Value::as_str).unwrap_or_default();
    if CLUSTER_SCOPED_KINDS.contains(&kind) {
        return;
    }
    let Some(root) = document.as_object_mut() else {
        return;
    };
    let metadata = root
        .entry("metadata")
        .or_insert_with(|| Value::Object(Default::default()));
    if let Some(metadata) = metadata.as_object_mut() {
        metadata.insert(
            "namespace".to_string(),
            Value::String(namespace.to_string()),
        );
    }
}

fn to_dynamic(document: Value) -> Result<DynamicObject> {
    let api_version = document
        .get("apiVersion")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let kind = document.get("kind").and_then(Value::as_str).unwrap_or_default();
    let name = document
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if api_version.is_empty() || kind.is_empty() || name.is_empty() {
        return Err(GroundworkError::RenderError(format!(
            "document is missing apiVersion, kind or metadata.name: {}",
            document
        )));
    }
    serde_json::from_value(document).map_err(|e| GroundworkError::RenderError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_file(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn as_json(objects: &[DynamicObject]) -> Vec<Value> {
        objects
            .iter()
            .map(|o| serde_json::to_value(o).unwrap())
            .collect()
    }

    #[test]
    fn test_renders_overlay_and_forces_namespace() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "kustomization.yaml",
            "resources:\n  - configmap.yaml\n",
        );
        write_file(
            dir.path(),
            "configmap.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\n  namespace: declared-elsewhere\ndata:\n  key: value\n",
        );

        let objects = render(dir.path(), "ns1").unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].metadata.name.as_deref(), Some("settings"));
        assert_eq!(objects[0].metadata.namespace.as_deref(), Some("ns1"));
    }

    #[test]
    fn test_falls_back_to_default_overlay() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "default/kustomization.yaml",
            "resources:\n  - configmap.yaml\n",
        );
        write_file(
            dir.path(),
            "default/configmap.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\ndata: {}\n",
        );

        let objects = render(dir.path(), "ns1").unwrap();
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn test_missing_overlay_root_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = render(dir.path(), "ns1").err().unwrap();
        assert!(matches!(err, GroundworkError::RenderError(_)));
    }

    #[test]
    fn test_composes_base_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "base/kustomization.yaml",
            "resources:\n  - deployment.yaml\n",
        );
        write_file(
            dir.path(),
            "base/deployment.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: server\nspec:\n  replicas: 1\n",
        );
        write_file(
            dir.path(),
            "overlay/kustomization.yaml",
            "resources:\n  - ../base\n  - extra.yaml\n",
        );
        write_file(
            dir.path(),
            "overlay/extra.yaml",
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: server\nspec:\n  ports: []\n",
        );

        let objects = render(&dir.path().join("overlay"), "apps").unwrap();
        let kinds: Vec<_> = objects
            .iter()
            .map(|o| o.types.as_ref().unwrap().kind.clone())
            .collect();
        assert_eq!(kinds, vec!["Deployment", "Service"]);
    }

    #[test]
    fn test_unresolvable_base_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "kustomization.yaml",
            "resources:\n  - ../missing-base\n",
        );

        let err = render(dir.path(), "ns1").err().unwrap();
        assert!(matches!(err, GroundworkError::RenderError(_)));
    }

    #[test]
    fn test_base_without_kustomization_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "kustomization.yaml", "resources:\n  - base\n");
        fs::create_dir_all(dir.path().join("base")).unwrap();

        let err = render(dir.path(), "ns1").err().unwrap();
        assert!(matches!(err, GroundworkError::RenderError(_)));
    }

    #[test]
    fn test_strategic_merge_patch() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "kustomization.yaml",
            "resources:\n  - configmap.yaml\npatchesStrategicMerge:\n  - patch.yaml\n",
        );
        write_file(
            dir.path(),
            "configmap.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\ndata:\n  keep: base\n  replace: base\n  remove: base\n",
        );
        write_file(
            dir.path(),
            "patch.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\ndata:\n  replace: patched\n  remove: null\n  added: patched\n",
        );

        let objects = render(dir.path(), "ns1").unwrap();
        let data = &as_json(&objects)[0]["data"];
        assert_eq!(data["keep"], "base");
        assert_eq!(data["replace"], "patched");
        assert_eq!(data["added"], "patched");
        assert!(data.get("remove").is_none());
    }

    #[test]
    fn test_patch_target_not_found_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "kustomization.yaml",
            "resources:\n  - configmap.yaml\npatchesStrategicMerge:\n  - patch.yaml\n",
        );
        write_file(
            dir.path(),
            "configmap.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\ndata: {}\n",
        );
        write_file(
            dir.path(),
            "patch.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: other\ndata: {}\n",
        );

        let err = render(dir.path(), "ns1").err().unwrap();
        assert!(matches!(err, GroundworkError::RenderError(_)));
    }

    #[test]
    fn test_multi_document_order_preserved() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "kustomization.yaml",
            "resources:\n  - all.yaml\n",
        );
        write_file(
            dir.path(),
            "all.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: first\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: second\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: third\n",
        );

        let objects = render(dir.path(), "ns1").unwrap();
        let names: Vec<_> = objects
            .iter()
            .map(|o| o.metadata.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_cluster_scoped_kinds_keep_no_namespace() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "kustomization.yaml",
            "resources:\n  - clusterrole.yaml\n",
        );
        write_file(
            dir.path(),
            "clusterrole.yaml",
            "apiVersion: rbac.authorization.k8s.io/v1\nkind: ClusterRole\nmetadata:\n  name: reader\nrules: []\n",
        );

        let objects = render(dir.path(), "ns1").unwrap();
        assert_eq!(objects[0].metadata.namespace, None);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "kustomization.yaml",
            "resources:\n  - a.yaml\n  - b.yaml\n",
        );
        write_file(
            dir.path(),
            "a.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\ndata:\n  x: \"1\"\n",
        );
        write_file(
            dir.path(),
            "b.yaml",
            "apiVersion: v1\nkind: Secret\nmetadata:\n  name: b\nstringData:\n  y: \"2\"\n",
        );

        let first = render(dir.path(), "ns1").unwrap();
        let second = render(dir.path(), "ns1").unwrap();
        assert_eq!(as_json(&first), as_json(&second));
    }

    #[test]
    fn test_document_without_name_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "kustomization.yaml",
            "resources:\n  - broken.yaml\n",
        );
        write_file(
            dir.path(),
            "broken.yaml",
            "apiVersion: v1\nkind: ConfigMap\ndata: {}\n",
        );

        let err = render(dir.path(), "ns1").err().unwrap();
        assert!(matches!(err, GroundworkError::RenderError(_)));
    }
}
