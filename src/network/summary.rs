use std::collections::HashMap;
use std::fmt;

use crate::math::tensor::Shape;
use crate::network::network::Network;

/// One line of a model summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// Unique snake-case name, e.g. `conv2d_1`.
    pub name: String,
    pub kind: &'static str,
    pub output_shape: Shape,
    pub params: usize,
}

/// Layer-by-layer table of output shapes and parameter counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
    pub total_params: usize,
}

impl Summary {
    pub fn of(network: &Network) -> Summary {
        let mut seen: HashMap<&'static str, usize> = HashMap::new();
        let rows: Vec<SummaryRow> = network.layers.iter().map(|layer| {
            let kind = layer.kind();
            let n = seen.entry(kind).or_insert(0);
            let base = snake_case(kind);
            let name = if *n == 0 { base } else { format!("{}_{}", base, n) };
            *n += 1;
            SummaryRow { name, kind, output_shape: layer.output_shape(), params: layer.param_count() }
        }).collect();
        let total_params = rows.iter().map(|r| r.params).sum();
        Summary { rows, total_params }
    }
}

/// `MaxPooling2D` → `max_pooling2d`
fn snake_case(kind: &str) -> String {
    let mut out = String::with_capacity(kind.len() + 4);
    for (i, ch) in kind.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    // A trailing "2D" stays joined: conv2d, not conv2_d.
    out.replace("2_d", "2d")
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: \"sequential\"")?;
        writeln!(f, "{}", "_".repeat(65))?;
        writeln!(f, "{:<29}{:<26}{:>10}", "Layer (type)", "Output Shape", "Param #")?;
        writeln!(f, "{}", "=".repeat(65))?;
        for (i, row) in self.rows.iter().enumerate() {
            let label = format!("{} ({})", row.name, row.kind);
            writeln!(f, "{:<29}{:<26}{:>10}", label, row.output_shape.to_string(), row.params)?;
            if i + 1 < self.rows.len() {
                writeln!(f)?;
            }
        }
        writeln!(f, "{}", "=".repeat(65))?;
        writeln!(f, "Total params: {}", group_thousands(self.total_params))?;
        writeln!(f, "Trainable params: {}", group_thousands(self.total_params))?;
        writeln!(f, "Non-trainable params: 0")?;
        write!(f, "{}", "_".repeat(65))
    }
}
