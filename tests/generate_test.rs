//! Integration tests for `mapposter generate`
//!
//! Map data is seeded into the cache so that no Overpass request is made.

mod common;

use common::{stderr, stdout, TestEnv};
use mapposter::core::coordinates::{parse_location, GeoPoint};
use mapposter::core::geometry::compensated_distance;
use mapposter::core::poster_config::{inches_to_mm, PosterConfig};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COORDS: &str = "48.8566, 2.3522";

/// Fetch radius the CLI derives for `-d dist -W width -H height`
fn fetch_distance(dist: u32, width: f64, height: f64) -> f64 {
    let config = PosterConfig {
        width_mm: Some(inches_to_mm(width)),
        height_mm: Some(inches_to_mm(height)),
        ..PosterConfig::default()
    };
    compensated_distance(
        f64::from(dist),
        config.width_in().unwrap(),
        config.height_in().unwrap(),
        0.0,
    )
}

fn seeded_env() -> (TestEnv, GeoPoint) {
    let env = TestEnv::new();
    let center = parse_location(COORDS).unwrap();
    env.seed_map_data(center, fetch_distance(4000, 4.0, 6.0));
    (env, center)
}

fn base_args(env: &TestEnv) -> Vec<String> {
    [
        "generate",
        "--city",
        "Paris",
        "--country",
        "France",
        "--coords",
        COORDS,
        "-d",
        "4000",
        "-W",
        "4",
        "-H",
        "6",
        "--layers",
        "roads,water",
        "-f",
        "svg",
        "-o",
    ]
    .iter()
    .map(ToString::to_string)
    .chain([env.posters_dir().display().to_string()])
    .collect()
}

fn run_generate(env: &TestEnv, extra: &[&str]) -> std::process::Output {
    let mut args = base_args(env);
    args.extend(extra.iter().map(ToString::to_string));
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    env.run(&refs)
}

#[test]
fn test_generate_svg_from_cached_data() {
    let (env, _) = seeded_env();
    let output = run_generate(&env, &["-t", "feature_based"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let posters = env.posters();
    assert_eq!(posters.len(), 1);
    let poster = &posters[0];
    assert!(poster.starts_with(env.posters_dir().join("Paris")));
    let name = poster.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("paris_feature_based_"));
    assert!(name.ends_with(".svg"));

    let svg = std::fs::read_to_string(poster).unwrap();
    assert!(svg.contains("P  A  R  I  S"));
    assert!(svg.contains("FRANCE"));
    // water color of the theme
    assert!(svg.contains("#c0c0c0"));
}

#[test]
fn test_generate_all_themes_reuses_fetched_data() {
    let (env, _) = seeded_env();
    let output = run_generate(&env, &["--all-themes"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let themes = mapposter::core::theme::available_themes(&common::themes_dir());
    assert_eq!(env.posters().len(), themes.len());
}

#[test]
fn test_generate_png_output() {
    let (env, _) = seeded_env();
    let mut args = base_args(&env);
    let format = args.iter().position(|a| a == "svg").unwrap();
    args[format] = "png".to_string();
    args.extend(["--dpi".to_string(), "30".to_string()]);
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = env.run(&refs);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let posters = env.posters();
    assert_eq!(posters.len(), 1);
    let png = std::fs::read(&posters[0]).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[test]
fn test_generate_json_lists_outputs() {
    let (env, _) = seeded_env();
    let output = run_generate(&env, &["--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["outputs"].as_array().unwrap().len(), 1);
    assert!((value["center"]["lat"].as_f64().unwrap() - 48.8566).abs() < 1e-9);
}

#[test]
fn test_missing_street_network_fails() {
    let env = TestEnv::new();
    let output = run_generate(&env, &[]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("street network"));
    assert!(env.posters().is_empty());
}

#[test]
fn test_unknown_theme_fails() {
    let (env, _) = seeded_env();
    let output = run_generate(&env, &["-t", "does_not_exist"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("does_not_exist"));
    assert!(err.contains("noir"));
}

#[test]
fn test_unknown_layer_fails() {
    let (env, _) = seeded_env();
    let output = run_generate(&env, &["--layers", "roads,lava"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("lava"));
}

#[test]
fn test_saved_config_reproduces_poster() {
    let (env, _) = seeded_env();
    let config = env.path().join("paris.json");
    let config_arg = config.display().to_string();

    let output = run_generate(&env, &["-t", "noir", "--save-config", &config_arg]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let saved = std::fs::read_to_string(&config).unwrap();
    assert!(saved.contains("Paris"));
    assert!(saved.contains("noir"));

    let posters_arg = env.posters_dir().display().to_string();
    let output = env.run(&["generate", "--config", &config_arg, "-t", "blueprint", "-o", &posters_arg]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(env.posters().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_generate_geocodes_city() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Paris, France"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "lat": "48.8566", "lon": "2.3522", "display_name": "Paris, France" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (env, _) = seeded_env();
    env.write_settings(&format!("{}/search", server.uri()));
    let posters = env.posters_dir().display().to_string();

    let output = tokio::task::spawn_blocking(move || {
        let output = env.run(&[
            "generate", "-c", "Paris", "-C", "France", "-d", "4000", "-W", "4", "-H", "6", "--layers",
            "roads,water", "-f", "svg", "-o", &posters,
        ]);
        (env, output)
    })
    .await
    .unwrap();
    let (env, output) = output;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(env.posters().len(), 1);
    assert!(env.cache_dir().join("coords_paris_france.json").exists());
}
