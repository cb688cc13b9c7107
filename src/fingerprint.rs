//! Structural fingerprints of shader declarations, used as translation cache keys.

use serde_json::{json, Value};

use crate::syntax::{ShaderSource, Span};
use crate::translator::TranslateOptions;

pub type Fingerprint = [u8; 32];

/// Source spans only move diagnostics around; they are dropped from the key.
fn strip_spans(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("span");
            for v in map.values_mut() {
                strip_spans(v);
            }
        }
        Value::Array(items) => {
            for v in items {
                strip_spans(v);
            }
        }
        _ => {}
    }
}

fn collect_spans(value: &Value, out: &mut Vec<Span>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                if key == "span" {
                    if let Ok(span) = serde_json::from_value::<Span>(v.clone()) {
                        out.push(span);
                    }
                } else {
                    collect_spans(v, out);
                }
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_spans(v, out);
            }
        }
        _ => {}
    }
}

/// Every span in the declaration, in canonical traversal order. Two sources
/// with equal fingerprints yield lists of equal length that pair up node by node.
pub fn source_spans(source: &ShaderSource) -> Vec<Span> {
    let mut spans = Vec::new();
    if let Ok(value) = serde_json::to_value(source) {
        collect_spans(&value, &mut spans);
    }
    spans
}

pub fn canonical_source_value(source: &ShaderSource) -> Value {
    let mut value = serde_json::to_value(source).unwrap_or(Value::Null);
    strip_spans(&mut value);
    value
}

/// Fingerprint of everything that can change a translation's output.
pub fn compute_fingerprint(source: &ShaderSource, options: &TranslateOptions) -> Fingerprint {
    let payload = json!({
        "source": canonical_source_value(source),
        "bufferMode": options.buffer_mode,
        "emitBytecode": options.emit_bytecode,
    });
    let bytes = serde_json::to_vec(&payload).unwrap_or_default();
    hash_bytes(&bytes)
}

pub fn hash_bytes(bytes: &[u8]) -> [u8; 32] {
    fn fnv1a64_with_seed(bytes: &[u8], seed: u64) -> u64 {
        let mut hash = 0xcbf2_9ce4_8422_2325_u64 ^ seed;
        for &b in bytes {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }

    let seeds = [
        0x0000_0000_0000_0000,
        0x9e37_79b9_7f4a_7c15,
        0xc2b2_ae3d_27d4_eb4f,
        0x1656_67b1_9e37_79f9,
    ];
    let mut out = [0_u8; 32];
    for (chunk, seed) in out.chunks_exact_mut(8).zip(seeds) {
        chunk.copy_from_slice(&fnv1a64_with_seed(bytes, seed).to_le_bytes());
    }
    out
}

pub fn to_hex(fingerprint: &Fingerprint) -> String {
    fingerprint.iter().map(|b| format!("{b:02x}")).collect()
}
