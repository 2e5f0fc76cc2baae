use super::defaults::DefaultsConfig;
use super::file::{
    FileBounds, FileCalculation, FileDetector, FileElement, FileEvolution, FileExperiment,
    FileIsotope, FileLayer, FileSession,
};
use super::models::Session;
use crate::cli::{EvolutionArgs, SessionArgs};
use crate::error::{CliError, Result};
use ibafit::core::models::bounds::Bounds;
use ibafit::core::models::calculation::{
    CalculationSetup, ChargeFractionModel, CompoundCorrection, ScreeningModel, StoppingModel,
    StragglingModel,
};
use ibafit::core::models::element;
use ibafit::core::models::setup::{
    Calibration, DetectorSetup, ExperimentalSetup, GeometryConvention, Projectile,
};
use ibafit::core::models::target::{Isotope, Layer, LayerElement, Target};
use ibafit::engine::config::DeParameter;
use ibafit::engine::problem::Baseline;
use std::str::FromStr;

/// Loads the session file and layers `-S` overrides and evolution flags on top of it.
pub fn build_session(args: &SessionArgs, evolution: Option<&EvolutionArgs>) -> Result<Session> {
    let file = FileSession::from_file(&args.session)?;
    resolve_session(file, &args.set_values, evolution)
}

pub(super) fn resolve_session(
    file: FileSession,
    set_values: &[String],
    evolution: Option<&EvolutionArgs>,
) -> Result<Session> {
    let defaults = DefaultsConfig::default();
    let file = apply_set_values(file, set_values)?;

    let channels = file.channels.unwrap_or(defaults.channels);
    if channels == 0 {
        return Err(CliError::Config("`channels` must be at least 1".into()));
    }

    let experiment = resolve_experiment(&file, &defaults)?;
    let detector = resolve_detector(&file);
    let calculation = resolve_calculation(&file);

    let mut target = Target::new();
    for layer in &file.layers {
        target.push_layer(resolve_layer(layer)?);
    }
    let foil = file.foil.as_ref().map(resolve_layer).transpose()?;

    let overrides = evolution.cloned().unwrap_or_default();
    let evo = file.evolution.unwrap_or_default();
    let evolution = DeParameter::builder()
        .population_size(
            overrides
                .population
                .or(evo.population)
                .unwrap_or(defaults.population),
        )
        .generations(
            overrides
                .generations
                .or(evo.generations)
                .unwrap_or(defaults.generations),
        )
        .mutation_factor(evo.mutation_factor.unwrap_or(defaults.mutation_factor))
        .crossover_probability(
            evo.crossover_probability
                .unwrap_or(defaults.crossover_probability),
        )
        .window(
            overrides.start_ch.or(evo.start_ch).unwrap_or(0),
            overrides.end_ch.or(evo.end_ch).unwrap_or(channels - 1),
        )
        .num_bins(overrides.bins.or(evo.num_bins).unwrap_or(defaults.num_bins))
        .seed(overrides.seed.or(evo.seed))
        .parallel(!overrides.serial && evo.parallel.unwrap_or(true))
        .build()?;

    Ok(Session {
        baseline: Baseline {
            experiment,
            detector,
            target,
            foil,
            calculation,
        },
        channels,
        evolution,
    })
}

/// Converts a resolved session back into its file form, e.g. to save fitted values as a
/// new starting point.
pub fn export_session(session: &Session) -> FileSession {
    let baseline = &session.baseline;
    let exp = &baseline.experiment;
    let det = &baseline.detector;
    let calc = &baseline.calculation;
    let evo = &session.evolution;
    FileSession {
        channels: Some(session.channels),
        experiment: Some(FileExperiment {
            projectile: element::by_z(exp.projectile.z).map(|e| e.symbol.to_string()),
            projectile_mass: Some(exp.projectile.mass),
            beam_energy: Some(exp.beam_energy),
            energy_spread: Some(exp.energy_spread),
            alpha: Some(exp.alpha),
            theta: Some(exp.theta),
            geometry: Some(exp.geometry.name().into()),
            charge: Some(exp.charge),
            charge_bounds: file_bounds(exp.charge_bounds, exp.charge),
        }),
        detector: Some(FileDetector {
            resolution: Some(det.resolution),
            resolution_bounds: file_bounds(det.resolution_bounds, det.resolution),
            calibration_factor: Some(det.calibration.factor),
            calibration_factor_bounds: file_bounds(
                det.calibration.factor_bounds,
                det.calibration.factor,
            ),
            calibration_offset: Some(det.calibration.offset),
            calibration_offset_bounds: file_bounds(
                det.calibration.offset_bounds,
                det.calibration.offset,
            ),
            solid_angle: Some(det.solid_angle),
        }),
        calculation: Some(FileCalculation {
            stopping: Some(calc.stopping.name().into()),
            compound: Some(calc.compound.name().into()),
            straggling: Some(calc.straggling.name().into()),
            screening: Some(calc.screening.name().into()),
            charge_fraction: Some(calc.charge_fraction.name().into()),
            charge_fraction_fixed: Some(calc.charge_fraction_params.fixed),
            charge_fraction_intercept: Some(calc.charge_fraction_params.intercept),
            charge_fraction_slope: Some(calc.charge_fraction_params.slope),
            use_lookup_table: Some(calc.use_lookup_table),
            simulate_isotopes: Some(calc.simulate_isotopes),
            show_elements: Some(calc.show_elements),
            show_isotopes: Some(calc.show_isotopes),
            show_layers: Some(calc.show_layers),
            correction_factors: calc.correction_factors.clone(),
            depth_step: Some(calc.depth_step),
        }),
        layers: baseline.target.layers().map(|(_, l)| export_layer(l)).collect(),
        foil: baseline.foil.as_ref().map(export_layer),
        evolution: Some(FileEvolution {
            population: Some(evo.population_size),
            mutation_factor: Some(evo.mutation_factor),
            crossover_probability: Some(evo.crossover_probability),
            generations: Some(evo.generations),
            start_ch: Some(evo.window.start),
            end_ch: Some(evo.window.end),
            num_bins: Some(evo.num_bins),
            seed: evo.seed,
            parallel: Some(evo.parallel),
        }),
    }
}

/// Pinned bounds at the value itself are left implicit.
fn file_bounds(bounds: Bounds, value: f64) -> Option<FileBounds> {
    (!(bounds.is_fixed() && bounds.min == value)).then_some([bounds.min, bounds.max])
}

fn export_layer(layer: &Layer) -> FileLayer {
    FileLayer {
        thickness: layer.thickness,
        thickness_bounds: file_bounds(layer.thickness_bounds, layer.thickness),
        elements: layer
            .elements
            .iter()
            .map(|e| {
                let natural = LayerElement::natural(e.z, e.fraction).ok();
                let custom = natural.is_none_or(|n| n.isotopes != e.isotopes);
                FileElement {
                    symbol: e.symbol().to_string(),
                    fraction: e.fraction,
                    fraction_bounds: file_bounds(e.fraction_bounds, e.fraction),
                    isotopes: custom.then(|| {
                        e.isotopes
                            .iter()
                            .map(|i| FileIsotope {
                                mass: i.mass,
                                abundance: i.abundance,
                            })
                            .collect()
                    }),
                }
            })
            .collect(),
    }
}

fn bounds_or_fixed(bounds: Option<FileBounds>, value: f64) -> Bounds {
    bounds.map_or(Bounds::fixed(value), |[min, max]| Bounds::new(min, max))
}

fn resolve_experiment(file: &FileSession, defaults: &DefaultsConfig) -> Result<ExperimentalSetup> {
    let exp = file.experiment.clone().unwrap_or_default();
    let base = ExperimentalSetup::default();

    let symbol = exp.projectile.as_deref().unwrap_or(defaults.projectile);
    let data = element::by_symbol(symbol)
        .ok_or_else(|| CliError::Config(format!("Unknown projectile element '{symbol}'")))?;
    let projectile = Projectile {
        z: data.z,
        mass: exp.projectile_mass.unwrap_or_else(|| data.most_abundant_mass()),
    };

    let charge = exp.charge.unwrap_or(base.charge);
    Ok(ExperimentalSetup {
        projectile,
        beam_energy: exp.beam_energy.unwrap_or(base.beam_energy),
        energy_spread: exp.energy_spread.unwrap_or(base.energy_spread),
        alpha: exp.alpha.unwrap_or(base.alpha),
        theta: exp.theta.unwrap_or(base.theta),
        geometry: exp
            .geometry
            .as_deref()
            .map_or(base.geometry, GeometryConvention::from_name),
        charge,
        charge_bounds: bounds_or_fixed(exp.charge_bounds, charge),
    })
}

fn resolve_detector(file: &FileSession) -> DetectorSetup {
    let det = file.detector.clone().unwrap_or_default();
    let base = DetectorSetup::default();
    let resolution = det.resolution.unwrap_or(base.resolution);
    let factor = det.calibration_factor.unwrap_or(base.calibration.factor);
    let offset = det.calibration_offset.unwrap_or(base.calibration.offset);
    DetectorSetup {
        resolution,
        resolution_bounds: bounds_or_fixed(det.resolution_bounds, resolution),
        calibration: Calibration {
            factor,
            factor_bounds: bounds_or_fixed(det.calibration_factor_bounds, factor),
            offset,
            offset_bounds: bounds_or_fixed(det.calibration_offset_bounds, offset),
        },
        solid_angle: det.solid_angle.unwrap_or(base.solid_angle),
    }
}

fn resolve_calculation(file: &FileSession) -> CalculationSetup {
    let calc = file.calculation.clone().unwrap_or_default();
    let mut setup = CalculationSetup::default();
    setup.set_stopping(calc.stopping.as_deref().map(StoppingModel::from_name));
    setup.set_compound(calc.compound.as_deref().map(CompoundCorrection::from_name));
    setup.set_straggling(calc.straggling.as_deref().map(StragglingModel::from_name));
    setup.set_screening(calc.screening.as_deref().map(ScreeningModel::from_name));
    setup.set_charge_fraction(
        calc.charge_fraction
            .as_deref()
            .map(ChargeFractionModel::from_name),
    );
    let params = &mut setup.charge_fraction_params;
    params.fixed = calc.charge_fraction_fixed.unwrap_or(params.fixed);
    params.intercept = calc.charge_fraction_intercept.unwrap_or(params.intercept);
    params.slope = calc.charge_fraction_slope.unwrap_or(params.slope);
    setup.use_lookup_table = calc.use_lookup_table.unwrap_or(setup.use_lookup_table);
    setup.simulate_isotopes = calc.simulate_isotopes.unwrap_or(setup.simulate_isotopes);
    setup.show_elements = calc.show_elements.unwrap_or(setup.show_elements);
    setup.show_isotopes = calc.show_isotopes.unwrap_or(setup.show_isotopes);
    setup.show_layers = calc.show_layers.unwrap_or(setup.show_layers);
    setup.set_correction_factors(calc.correction_factors.as_deref());
    setup.set_depth_step(calc.depth_step);
    setup
}

fn resolve_element(file: &FileElement) -> Result<LayerElement> {
    let mut element = LayerElement::from_symbol(&file.symbol, file.fraction)
        .map_err(|e| CliError::Config(e.to_string()))?
        .with_fraction_bounds(bounds_or_fixed(file.fraction_bounds, file.fraction));
    if let Some(isotopes) = &file.isotopes {
        element.isotopes = isotopes
            .iter()
            .map(|i| Isotope {
                mass: i.mass,
                abundance: i.abundance,
            })
            .collect();
    }
    Ok(element)
}

fn resolve_layer(file: &FileLayer) -> Result<Layer> {
    let mut layer = Layer::new(file.thickness)
        .with_thickness_bounds(bounds_or_fixed(file.thickness_bounds, file.thickness));
    for element in &file.elements {
        layer = layer.with_element(resolve_element(element)?);
    }
    layer.normalize();
    Ok(layer)
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {key}: {value}")))
}

fn apply_set_values(mut config: FileSession, set_values: &[String]) -> Result<FileSession> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{kv_pair}'. Expected KEY=VALUE."
            )));
        };
        let key = key.trim();

        match key {
            "channels" => config.channels = Some(parse(key, value)?),
            "experiment.projectile" => {
                config.experiment.get_or_insert_with(Default::default).projectile = Some(value.trim().into())
            }
            "experiment.beam-energy" => {
                config.experiment.get_or_insert_with(Default::default).beam_energy = Some(parse(key, value)?)
            }
            "experiment.energy-spread" => {
                config.experiment.get_or_insert_with(Default::default).energy_spread = Some(parse(key, value)?)
            }
            "experiment.alpha" => {
                config.experiment.get_or_insert_with(Default::default).alpha = Some(parse(key, value)?)
            }
            "experiment.theta" => {
                config.experiment.get_or_insert_with(Default::default).theta = Some(parse(key, value)?)
            }
            "experiment.geometry" => {
                config.experiment.get_or_insert_with(Default::default).geometry = Some(value.trim().into())
            }
            "experiment.charge" => {
                config.experiment.get_or_insert_with(Default::default).charge = Some(parse(key, value)?)
            }
            "detector.resolution" => {
                config.detector.get_or_insert_with(Default::default).resolution =
                    Some(parse(key, value)?)
            }
            "detector.calibration-factor" => {
                config
                    .detector
                    .get_or_insert_with(Default::default)
                    .calibration_factor = Some(parse(key, value)?)
            }
            "detector.calibration-offset" => {
                config
                    .detector
                    .get_or_insert_with(Default::default)
                    .calibration_offset = Some(parse(key, value)?)
            }
            "detector.solid-angle" => {
                config.detector.get_or_insert_with(Default::default).solid_angle =
                    Some(parse(key, value)?)
            }
            "calculation.stopping" => {
                config.calculation.get_or_insert_with(Default::default).stopping =
                    Some(value.trim().into())
            }
            "calculation.compound" => {
                config.calculation.get_or_insert_with(Default::default).compound =
                    Some(value.trim().into())
            }
            "calculation.straggling" => {
                config.calculation.get_or_insert_with(Default::default).straggling =
                    Some(value.trim().into())
            }
            "calculation.screening" => {
                config.calculation.get_or_insert_with(Default::default).screening =
                    Some(value.trim().into())
            }
            "calculation.charge-fraction" => {
                config
                    .calculation
                    .get_or_insert_with(Default::default)
                    .charge_fraction = Some(value.trim().into())
            }
            "calculation.use-lookup-table" => {
                config
                    .calculation
                    .get_or_insert_with(Default::default)
                    .use_lookup_table = Some(parse(key, value)?)
            }
            "calculation.simulate-isotopes" => {
                config
                    .calculation
                    .get_or_insert_with(Default::default)
                    .simulate_isotopes = Some(parse(key, value)?)
            }
            "calculation.depth-step" => {
                config.calculation.get_or_insert_with(Default::default).depth_step =
                    Some(parse(key, value)?)
            }
            "evolution.population" => {
                config.evolution.get_or_insert_with(Default::default).population =
                    Some(parse(key, value)?)
            }
            "evolution.generations" => {
                config.evolution.get_or_insert_with(Default::default).generations =
                    Some(parse(key, value)?)
            }
            "evolution.mutation-factor" => {
                config
                    .evolution
                    .get_or_insert_with(Default::default)
                    .mutation_factor = Some(parse(key, value)?)
            }
            "evolution.crossover-probability" => {
                config
                    .evolution
                    .get_or_insert_with(Default::default)
                    .crossover_probability = Some(parse(key, value)?)
            }
            "evolution.start-ch" => {
                config.evolution.get_or_insert_with(Default::default).start_ch =
                    Some(parse(key, value)?)
            }
            "evolution.end-ch" => {
                config.evolution.get_or_insert_with(Default::default).end_ch =
                    Some(parse(key, value)?)
            }
            "evolution.num-bins" => {
                config.evolution.get_or_insert_with(Default::default).num_bins =
                    Some(parse(key, value)?)
            }
            "evolution.seed" => {
                config.evolution.get_or_insert_with(Default::default).seed =
                    Some(parse(key, value)?)
            }
            _ => {
                if let Some(rest) = key.strip_prefix("layer.") {
                    set_layer_value(&mut config, key, rest, value)?;
                } else {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{key}'"
                    )));
                }
            }
        }
    }
    Ok(config)
}

/// Handles `layer.<n>.thickness`, with `n` counted from 1.
fn set_layer_value(config: &mut FileSession, key: &str, rest: &str, value: &str) -> Result<()> {
    let Some((index, field)) = rest.split_once('.') else {
        return Err(CliError::Config(format!(
            "Unsupported configuration key for --set: '{key}'"
        )));
    };
    let index: usize = parse(key, index)?;
    let layer = index
        .checked_sub(1)
        .and_then(|i| config.layers.get_mut(i))
        .ok_or_else(|| CliError::Config(format!("No layer {index} in session for '{key}'")))?;
    match field {
        "thickness" => layer.thickness = parse(key, value)?,
        _ => {
            return Err(CliError::Config(format!(
                "Unsupported configuration key for --set: '{key}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SESSION: &str = r#"
        channels = 2048

        [experiment]
        projectile = "He"
        beam-energy = 2000.0
        theta = 165.0
        charge = 10.0
        charge-bounds = [5.0, 15.0]

        [detector]
        resolution = 18.0
        resolution-bounds = [12.0, 25.0]
        calibration-factor = 1.05
        calibration-factor-bounds = [1.0, 1.1]
        calibration-offset = 20.0

        [calculation]
        straggling = "bohr"
        screening = "lecuyer"
        depth-step = 5.0

        [[layers]]
        thickness = 1500.0
        thickness-bounds = [1000.0, 2000.0]
        elements = [
            { symbol = "Si", fraction = 1.0, fraction-bounds = [0.3, 0.7] },
            { symbol = "O", fraction = 1.0, fraction-bounds = [0.3, 0.7] },
        ]

        [[layers]]
        thickness = 50000.0
        elements = [{ symbol = "Si", fraction = 1.0 }]

        [evolution]
        population = 24
        generations = 100
        end-ch = 1500
        num-bins = 2
        seed = 7
    "#;

    fn session(set_values: &[&str], evolution: Option<&EvolutionArgs>) -> Result<Session> {
        let file = FileSession::from_toml(SESSION).unwrap();
        let set: Vec<String> = set_values.iter().map(|s| s.to_string()).collect();
        resolve_session(file, &set, evolution)
    }

    #[test]
    fn session_file_values_are_resolved() {
        let s = session(&[], None).unwrap();
        assert_eq!(s.channels, 2048);
        let exp = &s.baseline.experiment;
        assert_eq!(exp.projectile.z, 2);
        assert!((exp.projectile.mass - 4.0026).abs() < 1e-3);
        assert_eq!(exp.theta, 165.0);
        assert_eq!(exp.charge_bounds, Bounds::new(5.0, 15.0));
        let det = &s.baseline.detector;
        assert_eq!(det.calibration.offset_bounds, Bounds::fixed(20.0));
        assert_eq!(s.baseline.calculation.straggling, StragglingModel::Bohr);
        assert_eq!(s.baseline.calculation.screening, ScreeningModel::LEcuyer);
        assert_eq!(s.baseline.calculation.depth_step, 5.0);

        assert_eq!(s.baseline.target.len(), 2);
        let (_, first) = s.baseline.target.layers().next().unwrap();
        assert!((first.elements[0].fraction - 0.5).abs() < 1e-12);
        let (_, second) = s.baseline.target.layers().nth(1).unwrap();
        assert!(second.thickness_bounds.is_fixed());

        assert_eq!(s.evolution.population_size, 24);
        assert_eq!(s.evolution.window.start, 0);
        assert_eq!(s.evolution.window.end, 1500);
        assert_eq!(s.evolution.num_bins, 2);
        assert_eq!(s.evolution.seed, Some(7));
    }

    #[test]
    fn set_values_override_file_and_flags_override_both() {
        let flags = EvolutionArgs {
            generations: Some(3),
            seed: Some(99),
            serial: true,
            ..Default::default()
        };
        let s = session(
            &[
                "experiment.beam-energy=2200",
                "evolution.generations=50",
                "layer.2.thickness=40000",
                "calculation.stopping=bethe",
            ],
            Some(&flags),
        )
        .unwrap();
        assert_eq!(s.baseline.experiment.beam_energy, 2200.0);
        assert_eq!(s.evolution.generations, 3);
        assert_eq!(s.evolution.seed, Some(99));
        assert!(!s.evolution.parallel);
        assert_eq!(s.baseline.calculation.stopping, StoppingModel::Bethe);
        let (_, second) = s.baseline.target.layers().nth(1).unwrap();
        assert_eq!(second.thickness, 40000.0);
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        assert!(matches!(session(&["no-equals"], None), Err(CliError::Config(_))));
        assert!(matches!(session(&["experiment.theta=abc"], None), Err(CliError::Config(_))));
        assert!(matches!(session(&["bogus.key=1"], None), Err(CliError::Config(_))));
        assert!(matches!(session(&["layer.9.thickness=1"], None), Err(CliError::Config(_))));
    }

    #[test]
    fn unknown_model_names_fall_back_to_defaults() {
        let s = session(&["calculation.straggling=unheard-of"], None).unwrap();
        assert_eq!(s.baseline.calculation.straggling, StragglingModel::Chu);
    }

    #[test]
    fn unknown_session_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[experiment]\nbeam-energies = 2000.0\n").unwrap();
        let args = SessionArgs {
            session: path,
            set_values: vec![],
        };
        assert!(matches!(
            build_session(&args, None),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn unknown_element_symbol_is_a_config_error() {
        let file = FileSession::from_toml(
            "[[layers]]\nthickness = 10.0\nelements = [{ symbol = \"Xx\", fraction = 1.0 }]\n",
        )
        .unwrap();
        assert!(matches!(resolve_session(file, &[], None), Err(CliError::Config(_))));
    }

    #[test]
    fn exported_session_resolves_to_the_same_values() {
        let mut original = session(&[], None).unwrap();
        for layer in original.baseline.target.layers_mut() {
            layer.thickness += 12.5;
        }
        original.baseline.detector.resolution = 21.0;

        let text = export_session(&original).to_toml().unwrap();
        let file = FileSession::from_toml(&text).unwrap();
        let reloaded = resolve_session(file, &[], None).unwrap();

        assert_eq!(reloaded.channels, original.channels);
        assert_eq!(reloaded.baseline.experiment, original.baseline.experiment);
        assert_eq!(reloaded.baseline.detector, original.baseline.detector);
        assert_eq!(reloaded.baseline.calculation, original.baseline.calculation);
        let layers = |s: &Session| -> Vec<Layer> {
            s.baseline.target.layers().map(|(_, l)| l.clone()).collect()
        };
        assert_eq!(layers(&reloaded), layers(&original));
        assert_eq!(reloaded.baseline.foil, original.baseline.foil);
        assert_eq!(reloaded.evolution, original.evolution);
    }

    #[test]
    fn invalid_evolution_settings_surface_as_config_errors() {
        let result = session(&["evolution.population=2"], None);
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
