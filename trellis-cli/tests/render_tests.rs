use std::fs;
use std::path::PathBuf;

fn case_dir(suffix: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let dir = PathBuf::from(manifest_dir)
        .join("../target/trellis-cli-tests")
        .join(format!("{}-{suffix}", std::process::id()));
    fs::create_dir_all(&dir).expect("create case dir");
    dir
}

#[test]
fn render_fills_each_rows_from_json() {
    let dir = case_dir("each");
    let template = dir.join("list.html");
    let data = dir.join("data.json");
    fs::write(
        &template,
        r#"<ul><li data-each="items as it" data-text="it"></li></ul>"#,
    )
    .expect("write template");
    fs::write(&data, r#"{"items": ["a", "b"]}"#).expect("write data");

    let html = trellis_cli::render_cmd(&template, Some(data.as_path()), None).expect("render");
    assert_eq!(html, "<ul><li>a</li><li>b</li><!--each--></ul>");
}

#[test]
fn render_defaults_to_null_data() {
    let dir = case_dir("null");
    let template = dir.join("page.html");
    fs::write(&template, r#"<p data-text="name"></p>"#).expect("write template");

    let html = trellis_cli::render_cmd(&template, None, None).expect("render");
    assert_eq!(html, "<p></p>");
}

#[test]
fn render_resolves_partials_by_file_stem() {
    let dir = case_dir("partials");
    let partials = dir.join("partials");
    fs::create_dir_all(&partials).expect("create partials dir");
    fs::write(partials.join("card.html"), "<span>T</span>").expect("write partial");
    let template = dir.join("page.html");
    fs::write(&template, r#"<div data-include="card"></div>"#).expect("write template");

    let html = trellis_cli::render_cmd(&template, None, Some(partials.as_path())).expect("render");
    assert_eq!(html, "<div><span>T</span></div>");
}

#[test]
fn check_accepts_a_valid_template() {
    let dir = case_dir("check-ok");
    let template = dir.join("ok.html");
    fs::write(
        &template,
        r#"<div><p data-if="on">yes</p><p data-else>no</p></div>"#,
    )
    .expect("write template");

    trellis_cli::check_cmd(&template, None).expect("check should pass");
}

#[test]
fn check_rejects_a_dangling_else() {
    let dir = case_dir("check-bad");
    let template = dir.join("bad.html");
    fs::write(&template, r#"<div><p data-else></p></div>"#).expect("write template");

    let err = trellis_cli::check_cmd(&template, None).expect_err("check should fail");
    assert!(err.to_string().contains("template error"));
}

#[test]
fn check_surfaces_broken_partials() {
    let dir = case_dir("check-partial");
    let partials = dir.join("partials");
    fs::create_dir_all(&partials).expect("create partials dir");
    fs::write(partials.join("bad.html"), r#"<p data-each="items"></p>"#).expect("write partial");
    let template = dir.join("page.html");
    fs::write(&template, "<div></div>").expect("write template");

    let err = trellis_cli::check_cmd(&template, Some(partials.as_path()))
        .expect_err("check should fail");
    assert!(err.to_string().contains("bad"));
}
