use serde_json::Map;
use serde_json::Value;

/// Copies every member of `template` missing from `target`.
///
/// Members present on both sides are merged recursively when both are
/// objects; otherwise the target's value is kept.
pub fn merge(
    template: &Map<String, Value>,
    target: &mut Map<String, Value>,
) {
    for (key, value) in template {
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), value.clone());
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(nested) = value {
                    merge(nested, existing);
                }
            }
            Some(_) => {}
        }
    }
}

/// Merges every template into every object element of every array member of
/// `doc`. Non-object templates and elements are skipped.
pub fn apply_global_templates(
    doc: &mut Value,
    templates: &[Value],
) {
    let Value::Object(members) = doc else {
        return;
    };
    for member in members.values_mut() {
        let Value::Array(items) = member else {
            continue;
        };
        for item in items.iter_mut() {
            let Value::Object(target) = item else {
                continue;
            };
            for template in templates {
                if let Value::Object(template) = template {
                    merge(template, target);
                }
            }
        }
    }
}
