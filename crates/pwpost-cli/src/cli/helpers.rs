use anyhow::Context;
use pwpost_core::domain::{DenseField, SpinComponent};
use pwpost_core::modules::dump::FileHeader;
use pwpost_core::modules::pseudo::PseudoPotential;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct FieldStatistics {
    pub(super) points: usize,
    pub(super) min: f64,
    pub(super) max: f64,
    pub(super) sum: f64,
}

impl FieldStatistics {
    pub(super) fn mean(&self) -> f64 {
        self.sum / self.points as f64
    }

    pub(super) fn render(&self) -> String {
        format!(
            "points {}  min {:.6e}  max {:.6e}  sum {:.6e}  mean {:.6e}",
            self.points,
            self.min,
            self.max,
            self.sum,
            self.mean()
        )
    }

    pub(super) fn to_json(self) -> Value {
        json!({
            "points": self.points,
            "min": self.min,
            "max": self.max,
            "sum": self.sum,
            "mean": self.mean(),
        })
    }
}

pub(super) fn field_statistics(field: &DenseField) -> FieldStatistics {
    FieldStatistics {
        points: field.values().len(),
        min: field.min(),
        max: field.max(),
        sum: field.sum(),
    }
}

pub(super) fn parse_spin_component(value: &str) -> Result<SpinComponent, String> {
    SpinComponent::from_name(value)
        .ok_or_else(|| format!("unknown spin component '{value}' (expected total, up or down)"))
}

pub(super) fn header_lines(header: &FileHeader) -> Vec<String> {
    let mut lines = vec![
        format!("prefix      {}", header.prefix),
        format!(
            "grid        {} x {} x {}",
            header.grid[0], header.grid[1], header.grid[2]
        ),
        format!(
            "smooth grid {} x {} x {}",
            header.smooth_grid[0], header.smooth_grid[1], header.smooth_grid[2]
        ),
        format!("ibrav       {}", header.ibrav),
        format!(
            "celldm      {}",
            header
                .celldm
                .iter()
                .map(|value| format!("{value:.6}"))
                .collect::<Vec<_>>()
                .join(" ")
        ),
        format!("species     {}", header.species.join(" ")),
    ];
    lines.extend(header.positions.iter().enumerate().map(|(index, position)| {
        format!(
            "atom {:4}   {:<4} {:>12.6} {:>12.6} {:>12.6}",
            index + 1,
            position.species,
            position.coords[0],
            position.coords[1],
            position.coords[2]
        )
    }));
    lines
}

pub(super) fn pseudo_summary_lines(pseudo: &PseudoPotential) -> Vec<String> {
    let mut lines = vec![
        format!("format      {}", pseudo.version.as_str()),
        format!("element     {}", pseudo.element().unwrap_or("-")),
        format!("mesh        {} points", pseudo.mesh_len()),
        format!("local       {}", presence(pseudo.local.as_deref())),
        format!("rho atom    {}", presence(pseudo.rho_atom.as_deref())),
        format!("projectors  {}", pseudo.beta_count()),
    ];
    if let Some(augmentation) = pseudo
        .nonlocal
        .as_ref()
        .and_then(|nonlocal| nonlocal.augmentation.as_ref())
    {
        lines.push(format!(
            "augmentation {} Q_ij(l), {} Q_ij",
            augmentation.qijl.len(),
            augmentation.qij.len()
        ));
    }
    lines
}

pub(super) fn pseudo_summary_json(pseudo: &PseudoPotential) -> Value {
    let nonlocal = pseudo.nonlocal.as_ref();
    json!({
        "format": pseudo.version.as_str(),
        "header": pseudo.header.attributes,
        "meshPoints": pseudo.mesh_len(),
        "localPoints": pseudo.local.as_ref().map(Vec::len),
        "rhoAtomPoints": pseudo.rho_atom.as_ref().map(Vec::len),
        "projectors": nonlocal
            .map(|nonlocal| nonlocal.betas.iter().map(|beta| beta.tag.as_str()).collect::<Vec<_>>())
            .unwrap_or_default(),
        "dijLength": nonlocal.and_then(|nonlocal| nonlocal.dij.as_ref()).map(Vec::len),
    })
}

pub(super) fn emit(value: &Value) -> anyhow::Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).context("failed to render JSON summary")?;
    println!("{rendered}");
    Ok(())
}

fn presence(values: Option<&[f64]>) -> String {
    match values {
        Some(values) => format!("{} points", values.len()),
        None => "absent".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{field_statistics, parse_spin_component};
    use pwpost_core::domain::{DenseField, GridShape, SpinComponent};

    #[test]
    fn spin_names_are_parsed() {
        assert_eq!(parse_spin_component("up"), Ok(SpinComponent::Up));
        assert!(parse_spin_component("sideways").is_err());
    }

    #[test]
    fn statistics_cover_every_point() {
        let shape = GridShape::new(2, 2, 1).expect("shape");
        let field = DenseField::from_values(shape, vec![1.0, -2.0, 3.0, 2.0]).expect("field");
        let statistics = field_statistics(&field);
        assert_eq!(statistics.points, 4);
        assert_eq!(statistics.min, -2.0);
        assert_eq!(statistics.max, 3.0);
        assert!((statistics.mean() - 1.0).abs() < 1.0e-15);
    }
}
