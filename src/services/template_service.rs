//! services/template_service.rs
//! Render de plantillas `{{variable}}` por destinatario. Función pura: nunca
//! falla, los valores ausentes quedan como cadena vacía.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::models::contact_model::ContactRecord;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("regex de placeholder válida"))
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Variables del contacto con clave en minúsculas. Las fijas ganan sobre
/// un campo personalizado con el mismo nombre.
fn variables(contact: &ContactRecord) -> HashMap<String, String> {
    let mut vars = HashMap::with_capacity(3 + contact.custom_fields.len());
    vars.insert(
        "nome".to_string(),
        contact.name.clone().unwrap_or_default(),
    );
    vars.insert("telefone".to_string(), contact.phone.clone());
    vars.insert(
        "email".to_string(),
        contact.email.clone().unwrap_or_default(),
    );

    for (key, value) in contact.custom_fields.iter() {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        vars.entry(key).or_insert_with(|| value_to_text(value));
    }
    vars
}

/// Produce el texto final para un contacto en una sola pasada:
/// `{{nome}}`, `{{telefone}}`, `{{email}}` y las claves de `custom_fields`
/// se reemplazan sin distinguir mayúsculas; cualquier otro `{{...}}` se
/// elimina.
pub fn render(template: &str, contact: &ContactRecord) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }

    let vars = variables(contact);
    placeholder()
        .replace_all(template, |caps: &Captures| {
            vars.get(&caps[1].to_lowercase())
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}
