use std::fs;
use std::path::Path;

use approx::assert_abs_diff_eq;
use image::imageops::{self, FilterType};

use fea2img::config::Config;
use fea2img::dataset::classification::create_classification_dataset;
use fea2img::dataset::convert::convert_all_inp_files;
use fea2img::dataset::extract_parts::extract_parts_from_inp_files;
use fea2img::dataset::file_utils::list_files;
use fea2img::dataset::geometry_to_image::DatasetRenderer;
use fea2img::dataset::merge::write_merged;
use fea2img::dataset::paired::generate_paired_dataset;
use fea2img::metrics::evaluation::calculate_metrics;
use fea2img::structs_and_impls::{FieldKind, Split, SurfaceMesh};

const AORTA: &str = "\
*Node
1, 0., 0., 0.
2, 1., 0., 0.
3, 0., 1., 0.
4, 0., 0., 1.
*Element, type=S3R
1, 1, 2, 3
2, 1, 2, 4
3, 2, 3, 4
4, 1, 3, 4
";

fn write_case(case: &Path) {
    fs::create_dir_all(case).unwrap();
    fs::write(case.join("TAVI_AORTA.inp"), AORTA).unwrap();
    fs::write(case.join("TAVI_STENT.obj"), "v 0 0 1.5\nv 1 0 1.5\nv 0 1 1.5\nf 1 2 3\n").unwrap();
    fs::write(
        case.join("TAVI_SPOS.csv"),
        "Node Label, S-Mises\n1, 0.05\n2, 0.15\n3, 0.25\n4, 0.35\n",
    )
    .unwrap();
}

fn small_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.dataset.data_dir = root.to_path_buf();
    config.files.aorta_suffix = "AORTA.inp".to_string();
    config.render.width = 48;
    config.render.height = 32;
    config.render.crop = 8;
    config.render.rotation_step = 180;
    config.render.anti_aliasing = 1;
    config.classification.good_cases = vec!["PATIENT-1_26".to_string()];
    config
}

#[test]
fn test_render_pair_classify_and_score() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    let patients = config.dataset.patients_path();
    for i in 1..=5 {
        write_case(&patients.join(format!("PATIENT-{}", i)).join("26"));
    }

    let renderer = DatasetRenderer::new(&config);
    let stats = renderer.render_all(&[FieldKind::Raw, FieldKind::Stress]).unwrap();
    assert_eq!(stats.cases, 10);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.frames, 20);

    // 80% of five patients train, the rest test
    let train = list_files(&renderer.output_dir(FieldKind::Stress, Split::Train)).unwrap();
    let test = list_files(&renderer.output_dir(FieldKind::Stress, Split::Test)).unwrap();
    assert_eq!((train.len(), test.len()), (8, 2));
    assert!(train.iter().chain(&test).all(|name| name.ends_with(".png") && name.contains("_26_z_")));

    let frame = image::open(renderer.output_dir(FieldKind::Raw, Split::Test).join(&test[0])).unwrap();
    assert_eq!((frame.width(), frame.height()), (32, 32));

    let dataset = &config.dataset;
    let pairs = generate_paired_dataset(
        &dataset.images_path(),
        &dataset.paired_path(),
        dataset,
        FieldKind::Raw,
        FieldKind::Stress,
    )
    .unwrap();
    assert_eq!(pairs, 10);
    let pair = image::open(dataset.paired_path().join("Train").join(&train[0])).unwrap();
    assert_eq!((pair.width(), pair.height()), (64, 32));

    let (good, bad) = create_classification_dataset(
        &dataset.images_path(),
        &dataset.classification_path(),
        dataset,
        FieldKind::Stress,
        &config.classification.good_cases,
    )
    .unwrap();
    assert_eq!((good, bad), (2, 8));

    // a prediction equal to the resized target scores perfectly
    let results = dir.path().join("results");
    fs::create_dir_all(&results).unwrap();
    let target = image::open(renderer.output_dir(FieldKind::Stress, Split::Train).join(&train[0]))
        .unwrap()
        .to_rgb8();
    target.save(results.join("case_target.png")).unwrap();
    imageops::resize(&target, 256, 256, FilterType::Triangle)
        .save(results.join("case_fake.png"))
        .unwrap();

    let averages = calculate_metrics(&results, config.evaluation.resize).unwrap();
    assert_eq!(averages.pairs, 1);
    assert_abs_diff_eq!(averages.mse, 0.0);
    assert_abs_diff_eq!(averages.ssim, 1.0, epsilon = 1e-9);
}

#[test]
fn test_deck_tools() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("PATIENT-4").join("29");
    fs::create_dir_all(&case).unwrap();

    let deck = format!(
        "*Heading\n*Part, name=AORTA\n{}*End Part\n*Part, name=STENT\n*Node\n5, 5., 5., 5.\n*End Part\n",
        AORTA
    );
    let model = case.join("TAVI_29MM.inp");
    fs::write(&model, deck).unwrap();

    let config = Config::default();
    assert_eq!(extract_parts_from_inp_files(dir.path(), &config.files).unwrap(), 1);
    let aorta = case.join("TAVI_29MM.inpAORTA_PRE.inp");
    assert!(fs::read_to_string(&aorta).unwrap().contains("*Element, type=S3R"));

    let csv = case.join("TAVI_CONTACT.csv");
    fs::write(&csv, "Node Label, CPRESS     General_Contact_Domain\n2, 0.5\n").unwrap();
    let merged = case.join("merged.csv");
    let rows = write_merged(&aorta, &csv, &config.columns.node, &config.columns.pressure, &merged).unwrap();
    assert_eq!(rows, 4);
    let text = fs::read_to_string(&merged).unwrap();
    assert!(text.starts_with("Node,X,Y,Z,Value\n1,0,0,0,0\n2,1,0,0,0.5\n"));

    // the model deck sorts first among the `.inp` files of the case
    assert_eq!(convert_all_inp_files(dir.path(), &config.files).unwrap(), 1);
    let surface = SurfaceMesh::read(case.join("TAVI_29MM.inp.stl")).unwrap();
    assert_eq!(surface.n_triangles(), 4);
}
