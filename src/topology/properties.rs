/// Kind of boundary condition applied along a polygon edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BoundaryConditionKind {
    /// No condition.
    #[default]
    None,
    /// Solid wall.
    Wall,
    /// Periodic with a matching edge elsewhere.
    Periodic,
    /// Prescribed inflow.
    Inflow,
    /// Open outflow.
    Outflow,
    /// Symmetry plane.
    Symmetry,
    /// Prescribed flux.
    Flux,
    /// Convective exchange.
    Convective,
    /// Insulated.
    Insulated,
    /// Prescribed temperature.
    Temperature,
}

/// A boundary condition record: a kind plus its numeric parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundaryCondition {
    /// The condition kind.
    pub kind: BoundaryConditionKind,
    /// Kind-specific parameters.
    pub values: [f64; 5],
}

impl BoundaryCondition {
    /// Creates a condition of the given kind with all parameters set to zero.
    #[must_use]
    pub fn new(kind: BoundaryConditionKind) -> Self {
        Self {
            kind,
            values: [0.0; 5],
        }
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_values(mut self, values: [f64; 5]) -> Self {
        self.values = values;
        self
    }
}

/// Per-edge metadata carried by a polygon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeProperties {
    /// Fluid boundary condition.
    pub fluid: BoundaryCondition,
    /// Thermal boundary condition.
    pub thermal: BoundaryCondition,
    /// Passive-scalar boundary conditions, indexed by scalar number.
    pub other: Vec<BoundaryCondition>,
}

impl EdgeProperties {
    /// Sets the fluid condition. Returns `true` if the value changed.
    pub fn set_fluid(&mut self, condition: BoundaryCondition) -> bool {
        replace_if_different(&mut self.fluid, condition)
    }

    /// Sets the thermal condition. Returns `true` if the value changed.
    pub fn set_thermal(&mut self, condition: BoundaryCondition) -> bool {
        replace_if_different(&mut self.thermal, condition)
    }

    /// Sets the condition at `index`, padding with defaults when `index` is past the end.
    /// Returns `true` if anything changed.
    pub fn set_other(&mut self, index: usize, condition: BoundaryCondition) -> bool {
        if index >= self.other.len() {
            self.other.resize(index, BoundaryCondition::default());
            self.other.push(condition);
            return true;
        }
        replace_if_different(&mut self.other[index], condition)
    }

    /// Returns the condition at `index`, if present.
    #[must_use]
    pub fn other(&self, index: usize) -> Option<&BoundaryCondition> {
        self.other.get(index)
    }
}

fn replace_if_different(slot: &mut BoundaryCondition, condition: BoundaryCondition) -> bool {
    if *slot == condition {
        false
    } else {
        *slot = condition;
        true
    }
}

/// Polygon-wide metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolygonProperties {
    /// Identifier of the material filling the polygon.
    pub material_id: String,
    /// Group number used by downstream solvers.
    pub group: i32,
}

impl PolygonProperties {
    /// Creates a new property record.
    #[must_use]
    pub fn new(material_id: impl Into<String>, group: i32) -> Self {
        Self {
            material_id: material_id.into(),
            group,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_other_pads_with_defaults() {
        let mut props = EdgeProperties::default();
        let wall = BoundaryCondition::new(BoundaryConditionKind::Wall);
        assert!(props.set_other(2, wall));
        assert_eq!(props.other.len(), 3);
        assert_eq!(props.other(0), Some(&BoundaryCondition::default()));
        assert_eq!(props.other(2), Some(&wall));
    }

    #[test]
    fn unchanged_condition_reports_false() {
        let mut props = EdgeProperties::default();
        let inflow = BoundaryCondition::new(BoundaryConditionKind::Inflow)
            .with_values([1.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(props.set_fluid(inflow));
        assert!(!props.set_fluid(inflow));
        assert!(!props.set_thermal(BoundaryCondition::default()));
    }
}
