//! Variable names and their value kinds.
//!
//! Variables are identified by name. Vector-valued nodal fields are stored
//! per component (`DISPLACEMENT_X`, ...), so every solution-step value is a
//! scalar. The registry in [`kind_of`] is used by the materials reader to
//! type JSON values.

/// Value kind of a registered variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Bool,
    Int,
    Double,
    Vector,
    Matrix,
    String,
}

// Material parameters
pub const YOUNG_MODULUS: &str = "YOUNG_MODULUS";
pub const POISSON_RATIO: &str = "POISSON_RATIO";
pub const DENSITY: &str = "DENSITY";
pub const YIELD_STRESS: &str = "YIELD_STRESS";
pub const ISOTROPIC_HARDENING_MODULUS: &str = "ISOTROPIC_HARDENING_MODULUS";
pub const SWELLING_SLOPE: &str = "SWELLING_SLOPE";
pub const NORMAL_COMPRESSION_SLOPE: &str = "NORMAL_COMPRESSION_SLOPE";
pub const DYNAMIC_VISCOSITY: &str = "DYNAMIC_VISCOSITY";
pub const VOLUME_ACCELERATION: &str = "VOLUME_ACCELERATION";
pub const FREE_STREAM_VELOCITY: &str = "FREE_STREAM_VELOCITY";
pub const CONSTITUTIVE_LAW_NAME: &str = "CONSTITUTIVE_LAW_NAME";

// Beam section
pub const CROSS_AREA: &str = "CROSS_AREA";
pub const I22: &str = "I22";
pub const I33: &str = "I33";
pub const TORSIONAL_INERTIA: &str = "TORSIONAL_INERTIA";

// Turbulence modelling
pub const TURBULENT_KINETIC_ENERGY: &str = "TURBULENT_KINETIC_ENERGY";
pub const TURBULENT_ENERGY_DISSIPATION_RATE: &str = "TURBULENT_ENERGY_DISSIPATION_RATE";
pub const TURBULENT_VISCOSITY: &str = "TURBULENT_VISCOSITY";
pub const KINEMATIC_VISCOSITY: &str = "KINEMATIC_VISCOSITY";
pub const TURBULENT_KINETIC_ENERGY_SIGMA: &str = "TURBULENT_KINETIC_ENERGY_SIGMA";
pub const TURBULENT_ENERGY_DISSIPATION_RATE_SIGMA: &str =
    "TURBULENT_ENERGY_DISSIPATION_RATE_SIGMA";
pub const TURBULENCE_RANS_C_MU: &str = "TURBULENCE_RANS_C_MU";
pub const TURBULENCE_RANS_C1: &str = "TURBULENCE_RANS_C1";
pub const TURBULENCE_RANS_C2: &str = "TURBULENCE_RANS_C2";

// Potential flow
pub const DISTANCE: &str = "DISTANCE";
pub const VELOCITY_POTENTIAL: &str = "VELOCITY_POTENTIAL";
pub const AUXILIARY_VELOCITY_POTENTIAL: &str = "AUXILIARY_VELOCITY_POTENTIAL";
pub const ADJOINT_VELOCITY_POTENTIAL: &str = "ADJOINT_VELOCITY_POTENTIAL";
pub const ADJOINT_AUXILIARY_VELOCITY_POTENTIAL: &str = "ADJOINT_AUXILIARY_VELOCITY_POTENTIAL";

// Nodal results / utilities
pub const NODAL_AREA: &str = "NODAL_AREA";
pub const TEMPERATURE: &str = "TEMPERATURE";

// Integration point and response quantities
pub const FORCE: &str = "FORCE";
pub const MOMENT: &str = "MOMENT";
pub const STRESS_ON_GP: &str = "STRESS_ON_GP";
pub const STRESS_ON_NODE: &str = "STRESS_ON_NODE";
pub const TRACED_STRESS_TYPE: &str = "TRACED_STRESS_TYPE";
pub const DETERMINANT_F: &str = "DETERMINANT_F";
pub const EQUIVALENT_PLASTIC_STRAIN: &str = "EQUIVALENT_PLASTIC_STRAIN";
pub const PLASTIC_STRAIN_VECTOR: &str = "PLASTIC_STRAIN_VECTOR";
pub const PRECONSOLIDATION_PRESSURE: &str = "PRECONSOLIDATION_PRESSURE";

// Vector fields, stored per component
pub const DISPLACEMENT: [&str; 3] = ["DISPLACEMENT_X", "DISPLACEMENT_Y", "DISPLACEMENT_Z"];
pub const ROTATION: [&str; 3] = ["ROTATION_X", "ROTATION_Y", "ROTATION_Z"];
pub const VELOCITY: [&str; 3] = ["VELOCITY_X", "VELOCITY_Y", "VELOCITY_Z"];
pub const ADJOINT_DISPLACEMENT: [&str; 3] = [
    "ADJOINT_DISPLACEMENT_X",
    "ADJOINT_DISPLACEMENT_Y",
    "ADJOINT_DISPLACEMENT_Z",
];
pub const ADJOINT_ROTATION: [&str; 3] =
    ["ADJOINT_ROTATION_X", "ADJOINT_ROTATION_Y", "ADJOINT_ROTATION_Z"];

/// Adjoint counterpart of a primal solution variable
pub fn adjoint_of(variable: &str) -> Option<&'static str> {
    if let Some(i) = DISPLACEMENT.iter().position(|v| *v == variable) {
        return Some(ADJOINT_DISPLACEMENT[i]);
    }
    if let Some(i) = ROTATION.iter().position(|v| *v == variable) {
        return Some(ADJOINT_ROTATION[i]);
    }
    match variable {
        VELOCITY_POTENTIAL => Some(ADJOINT_VELOCITY_POTENTIAL),
        AUXILIARY_VELOCITY_POTENTIAL => Some(ADJOINT_AUXILIARY_VELOCITY_POTENTIAL),
        _ => None,
    }
}

/// Value kind of a known variable, `None` for unregistered names
pub fn kind_of(name: &str) -> Option<VariableKind> {
    use VariableKind::*;
    let kind = match name {
        YOUNG_MODULUS
        | POISSON_RATIO
        | DENSITY
        | YIELD_STRESS
        | ISOTROPIC_HARDENING_MODULUS
        | SWELLING_SLOPE
        | NORMAL_COMPRESSION_SLOPE
        | DYNAMIC_VISCOSITY
        | KINEMATIC_VISCOSITY
        | CROSS_AREA
        | I22
        | I33
        | TORSIONAL_INERTIA
        | TURBULENT_KINETIC_ENERGY_SIGMA
        | TURBULENT_ENERGY_DISSIPATION_RATE_SIGMA
        | TURBULENCE_RANS_C_MU
        | TURBULENCE_RANS_C1
        | TURBULENCE_RANS_C2
        | PRECONSOLIDATION_PRESSURE
        | TEMPERATURE => Double,
        VOLUME_ACCELERATION | FREE_STREAM_VELOCITY => Vector,
        CONSTITUTIVE_LAW_NAME | TRACED_STRESS_TYPE => String,
        _ => return None,
    };
    Some(kind)
}

/// Strip an application prefix such as `Module.YOUNG_MODULUS`
pub fn trim_component_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjoint_mapping() {
        assert_eq!(adjoint_of("DISPLACEMENT_Y"), Some("ADJOINT_DISPLACEMENT_Y"));
        assert_eq!(adjoint_of("ROTATION_Z"), Some("ADJOINT_ROTATION_Z"));
        assert_eq!(
            adjoint_of(AUXILIARY_VELOCITY_POTENTIAL),
            Some(ADJOINT_AUXILIARY_VELOCITY_POTENTIAL)
        );
        assert_eq!(adjoint_of(TURBULENT_KINETIC_ENERGY), None);
    }

    #[test]
    fn registry_kinds() {
        assert_eq!(kind_of(YOUNG_MODULUS), Some(VariableKind::Double));
        assert_eq!(kind_of(VOLUME_ACCELERATION), Some(VariableKind::Vector));
        assert_eq!(kind_of("SOMETHING_CUSTOM"), None);
    }

    #[test]
    fn trims_module_prefix() {
        assert_eq!(
            trim_component_name("StructuralMechanicsApplication.YOUNG_MODULUS"),
            "YOUNG_MODULUS"
        );
        assert_eq!(trim_component_name("DENSITY"), "DENSITY");
    }
}
