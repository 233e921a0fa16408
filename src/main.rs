//! Entry point: loads a binary packet trace and an INI configuration, runs
//! every approximate detector against the ground-truth oracle, runs both
//! re-timing optimizers through the jitter-control buffer pool, and prints
//! the combined report.

use std::process::ExitCode;

use tracing::{info, instrument};

use jitter_sketch::cli;
use jitter_sketch::config::Config;
use jitter_sketch::control::JitterControlExperiment;
use jitter_sketch::detector::{DelaySketch, Detector, FDFilter, JitterSketch, JitterSketchS1Opt};
use jitter_sketch::eval::{evaluate_detector, DetectorReport};
use jitter_sketch::hash::AwareHash;
use jitter_sketch::logger;
use jitter_sketch::optimizer::{JitterSketchOptimizer, Oldc, Optimizer};
use jitter_sketch::record::{self, Record};
use jitter_sketch::report::{self, OptimizerReport};

fn main() -> ExitCode {
    let args = cli::parse_args();
    logger::init(args.verbose);

    let config = match Config::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(data_file = %config.data_file.display(), "loading packet trace");
    let records = record::load_records(&config.data_file);
    info!(records = records.len(), "trace loaded");

    let detector_reports = run_detectors(&config, &records);
    let optimizer_reports = run_optimizers(&config, &records);

    report::print_report(records.len(), &detector_reports, &optimizer_reports, args.stats_json);
    ExitCode::SUCCESS
}

#[instrument(skip(config, records))]
fn run_detectors(config: &Config, records: &[Record]) -> Vec<DetectorReport> {
    let jitter_params = config.jitter_params;
    let eval_params = config.eval_params();

    let fd = config.fdfilter_params();
    let mut fdfilter = FDFilter::<AwareHash>::new(
        fd.k,
        fd.kk,
        fd.nbits,
        fd.num_hash,
        fd.gnbits,
        fd.gnum_hash,
        fd.delay_thres,
        jitter_params,
        fd.ifpd_map_size,
        fd.cm_width,
        fd.cm_depth,
    );

    let ds = config.delay_sketch_params();
    let mut delay_sketch = DelaySketch::<AwareHash>::new(
        ds.d,
        ds.w,
        jitter_params,
        ds.ifpd_map_size,
        ds.cm_width,
        ds.cm_depth,
    );

    let js = config.jitter_sketch_params();
    let mut jitter_sketch = JitterSketch::new(js.w1, js.w2, js.w3, js.d3, jitter_params);

    let js1 = config.jitter_sketch_s1opt_params();
    let mut jitter_sketch_s1opt = JitterSketchS1Opt::new(
        js1.base.w1,
        js1.base.w2,
        js1.base.w3,
        js1.base.d3,
        js1.s1_hash_num,
        jitter_params,
    );

    let detectors: [(&'static str, &mut dyn Detector); 4] = [
        ("FDFilter", &mut fdfilter),
        ("DelaySketch", &mut delay_sketch),
        ("JitterSketch", &mut jitter_sketch),
        ("JitterSketchS1Opt", &mut jitter_sketch_s1opt),
    ];

    detectors
        .into_iter()
        .map(|(label, detector)| {
            info!(detector = label, "evaluating");
            evaluate_detector(label, detector, records, jitter_params, eval_params)
        })
        .collect()
}

#[instrument(skip(config, records))]
fn run_optimizers(config: &Config, records: &[Record]) -> Vec<OptimizerReport> {
    let frequency_threshold = config.jitter_params.frequency_threshold;

    let oldc = Oldc::new(config.control.buffering_horizon);
    let mut oldc_experiment = JitterControlExperiment::new(
        Box::new(oldc),
        config.control.max_buffers,
        config.control.buffer_timeout_us,
        frequency_threshold,
    );
    info!(optimizer = "OLDC", "running control experiment");
    let oldc_metrics = oldc_experiment.run(records);

    let dj = config.dj_sketch_optimizer_params();
    let dj_sketch = JitterSketch::new(dj.w1, dj.w2, dj.w3, dj.d3, config.jitter_params);
    let sketch_optimizer =
        JitterSketchOptimizer::new(dj_sketch, config.control.buffering_horizon);
    let mut sketch_experiment: JitterControlExperiment = JitterControlExperiment::new(
        Box::new(sketch_optimizer) as Box<dyn Optimizer>,
        config.control.max_buffers,
        config.control.buffer_timeout_us,
        frequency_threshold,
    );
    info!(optimizer = "JitterSketchOptimizer", "running control experiment");
    let sketch_metrics = sketch_experiment.run(records);

    vec![
        OptimizerReport::from_metrics("OLDC", &oldc_metrics),
        OptimizerReport::from_metrics("JitterSketchOptimizer", &sketch_metrics),
    ]
}
