use std::process::ExitCode;
use std::sync::Arc;

use mpfe_core::variables::{DISPLACEMENT, ROTATION};
use mpfe_core::{
    AssembledSystem, Assembler, AssemblyOptions, AssemblyStrategy, DofNumbering, DynamicEntity, Mesh,
    ProcessInfo, Properties, PropertyAssignment,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn usage() {
    eprintln!("usage: mpfe-cli check-materials <materials.json>");
    eprintln!("       mpfe-cli assemble-demo [num_elements] [assembly options json]");
}

fn print_assignment(assignment: &PropertyAssignment) {
    let properties = &assignment.properties;
    println!("model_part: {}", assignment.model_part_name);
    println!("  properties_id: {}", properties.id());
    println!("  variables: {}", properties.num_values());
    println!("  tables: {}", properties.num_tables());
    println!("  sub_properties: {}", properties.num_sub_properties());
    if let Some(law) = properties.law() {
        println!("  constitutive_law: {}", law.name());
    }
}

fn check_materials(path: &str) -> ExitCode {
    match mpfe_core::read_materials_file(path) {
        Ok(assignments) => {
            for assignment in &assignments {
                print_assignment(assignment);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("materials error ({:?}): {err}", err.category());
            ExitCode::from(1)
        }
    }
}

/// Straight chain of corotational beams along x with a small bending field
fn demo_chain(num_elements: usize) -> mpfe_core::Result<(Mesh, Vec<DynamicEntity>)> {
    let mut mesh = Mesh::new();
    for i in 0..=num_elements {
        mesh.create_node(i + 1, i as f64, 0.0, 0.0);
    }
    let mut vars: Vec<&str> = DISPLACEMENT.to_vec();
    vars.extend_from_slice(&ROTATION);
    mesh.add_variables_with_dofs(&vars);
    for (id, node) in mesh.nodes.iter_mut() {
        let x = (*id - 1) as f64 / num_elements as f64;
        node.set_solution_step_value("DISPLACEMENT_Y", 1e-3 * x * x);
        node.set_solution_step_value("ROTATION_Z", 2e-3 * x);
    }

    let properties = Arc::new(
        Properties::new(1)
            .with("CROSS_AREA", 0.01)
            .with("YOUNG_MODULUS", 210e9)
            .with("POISSON_RATIO", 0.3)
            .with("I22", 2e-6)
            .with("I33", 1e-6)
            .with("TORSIONAL_INERTIA", 3e-6)
            .with("DENSITY", 7850.0),
    );
    let entities = (1..=num_elements)
        .map(|i| DynamicEntity::create("CrLinearBeamElement3D2N", i, vec![i, i + 1], properties.clone()))
        .collect::<mpfe_core::Result<Vec<_>>>()?;
    Ok((mesh, entities))
}

fn print_system(strategy: AssemblyStrategy, system: &AssembledSystem) {
    let rhs_norm = system.rhs.iter().map(|v| v * v).sum::<f64>().sqrt();
    println!(
        "{:?}: equations={} nnz={} |rhs|={:.6e}",
        strategy,
        system.num_equations(),
        system.lhs.nnz(),
        rhs_norm
    );
}

fn assemble_demo(num_elements: usize, options: AssemblyOptions) -> mpfe_core::Result<()> {
    let (mut mesh, entities) = demo_chain(num_elements)?;
    let num_equations = DofNumbering::assign(&mut mesh, &entities)?;
    tracing::info!(num_elements, num_equations, "built demo beam chain");
    let info = ProcessInfo::default();

    let reference = Assembler::new(AssemblyOptions {
        strategy: AssemblyStrategy::Ordered,
        ..options.clone()
    })
    .assemble(&mesh, &entities, num_equations, &info)?;
    print_system(AssemblyStrategy::Ordered, &reference);

    if options.strategy != AssemblyStrategy::Ordered {
        let system = Assembler::new(options.clone()).assemble(&mesh, &entities, num_equations, &info)?;
        print_system(options.strategy, &system);
        let max_difference = system
            .rhs
            .iter()
            .zip(&reference.rhs)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        println!("max |rhs - rhs_ordered| = {:.3e}", max_difference);
    }
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("check-materials") if args.len() == 3 => check_materials(&args[2]),
        Some("assemble-demo") if args.len() <= 4 => {
            let num_elements = match args.get(2).map(|s| s.parse::<usize>()) {
                None => 8,
                Some(Ok(n)) if n > 0 => n,
                Some(_) => {
                    usage();
                    return ExitCode::from(2);
                }
            };
            let options = match args.get(3) {
                None => AssemblyOptions {
                    strategy: AssemblyStrategy::Colored,
                    ..AssemblyOptions::default()
                },
                Some(json) => match AssemblyOptions::from_json(json) {
                    Ok(options) => options,
                    Err(err) => {
                        eprintln!("{err}");
                        return ExitCode::from(2);
                    }
                },
            };
            match assemble_demo(num_elements, options) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("assembly error ({:?}): {err}", err.category());
                    ExitCode::from(1)
                }
            }
        }
        _ => {
            usage();
            ExitCode::from(2)
        }
    }
}
