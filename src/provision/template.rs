//! Placeholder templating for embedded manifest bundles

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

/// Substitute participant placeholders in a manifest or seed document.
///
/// Both the `${VAR}` and `$VAR` spellings are replaced, matching what the
/// embedded bundles use.
pub fn render(template: &str, participant_name: &str, did: &str) -> String {
    template
        .replace("${PARTICIPANT_NAME}", participant_name)
        .replace("$PARTICIPANT_NAME", participant_name)
        .replace("${PARTICIPANT_ID}", did)
        .replace("$PARTICIPANT_ID", did)
}

/// Render a multi-document YAML bundle and parse it into JSON values,
/// skipping empty documents.
pub fn parse_documents(
    bundle: &str,
    participant_name: &str,
    did: &str,
) -> Result<Vec<Value>, Error> {
    let rendered = render(bundle, participant_name, did);
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&rendered) {
        let value = Value::deserialize(document)
            .map_err(|e| Error::template(format!("invalid YAML document: {}", e)))?;
        if value.is_null() {
            continue;
        }
        documents.push(value);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_both_placeholder_spellings() {
        let template = "name: ${PARTICIPANT_NAME}\nalt: $PARTICIPANT_NAME\nid: ${PARTICIPANT_ID}";
        let rendered = render(template, "acme", "did:web:acme");
        assert_eq!(rendered, "name: acme\nalt: acme\nid: did:web:acme");
    }

    #[test]
    fn parse_splits_documents_and_skips_blanks() {
        let bundle = "\
apiVersion: v1
kind: Namespace
metadata:
  name: ${PARTICIPANT_NAME}
---
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: controlplane
  namespace: ${PARTICIPANT_NAME}
";
        let documents = parse_documents(bundle, "acme", "did:web:acme").unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["kind"], "Namespace");
        assert_eq!(documents[0]["metadata"]["name"], "acme");
        assert_eq!(documents[1]["metadata"]["namespace"], "acme");
    }

    #[test]
    fn parse_rejects_malformed_yaml() {
        let bundle = "apiVersion: v1\nkind: [unclosed";
        assert!(parse_documents(bundle, "acme", "did:web:acme").is_err());
    }
}
