//! Declaration sources used across test suites.

/// Root variables of a `web` pack: a typed string, a number, and a map.
pub const WEB_VARIABLES: &str = r#"variable "image" {
  description = "Container image to run"
  type        = string
  default     = "nginx:1.27"
}

variable "replicas" {
  type    = number
  default = 1
}

variable "labels" {
  type    = map(string)
  default = {}
}
"#;

/// Root variables of a `redis` pack.
pub const REDIS_VARIABLES: &str = r#"variable "port" {
  type    = number
  default = 6379
}

variable "persistence" {
  type    = bool
  default = false
}
"#;

/// Renders a `variable` block. `ty` and `default` are expression source.
pub fn variable_block(name: &str, ty: Option<&str>, default: Option<&str>) -> String {
    let mut block = format!("variable \"{name}\" {{\n");
    if let Some(ty) = ty {
        block.push_str(&format!("  type = {ty}\n"));
    }
    if let Some(default) = default {
        block.push_str(&format!("  default = {default}\n"));
    }
    block.push_str("}\n");
    block
}
