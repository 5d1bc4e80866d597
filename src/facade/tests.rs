use super::*;
use crate::config::CcdConfig;
use crate::device::{DeviceClient, SimulatedClient};
use crate::session::{SessionController, SessionStatus};
use std::sync::Arc;
use std::time::Duration;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G'];

fn create_facade() -> (CommandFacade, Arc<SimulatedClient>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = CcdConfig::default();
    config.retry.max_attempts = 3;
    config.retry.interval_ms = 1;
    config.capture.data_dir = dir.path().to_string_lossy().into_owned();

    let client = Arc::new(
        SimulatedClient::builder()
            .sensor_size(40, 30)
            .telescope(false)
            .auto_deliver(false)
            .build(),
    );
    let device: Arc<dyn DeviceClient> = client.clone();
    let session = SessionController::from_config(&config, device);

    (CommandFacade::new(session, &config.analysis), client, dir)
}

async fn expose(facade: &CommandFacade, client: &SimulatedClient) {
    let response = facade.handle("startExposure", "", "POST").await;
    assert_eq!(response, FacadeResponse::ok());
    assert!(client.deliver_next());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while facade.session().status() != SessionStatus::Idle {
        assert!(tokio::time::Instant::now() < deadline, "no image arrived");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

fn text(response: &FacadeResponse) -> &str {
    match &response.body {
        ResponseBody::Text(text) | ResponseBody::Html(text) | ResponseBody::Json(text) => text,
        ResponseBody::Png(_) => panic!("unexpected PNG body"),
    }
}

#[test]
fn test_command_lookup_is_case_insensitive() {
    assert_eq!(
        Command::lookup(&Method::Post, "SETSUBFRAME").unwrap(),
        Command::SetSubFrame
    );
    assert_eq!(
        Command::lookup(&Method::Post, "setSubframe").unwrap(),
        Command::SetSubFrame
    );
    assert_eq!(
        Command::lookup(&Method::parse("get"), "getdata").unwrap(),
        Command::GetData
    );
    // Commands are only known under their own method
    assert!(Command::lookup(&Method::Get, "startExposure").is_err());
}

#[tokio::test]
async fn test_unknown_command_and_method() {
    let (facade, _client, _dir) = create_facade();

    let response = facade.handle("selfDestruct", "", "POST").await;
    assert_eq!(response.status, 404);
    assert_eq!(text(&response), "ERROR - Unrecognised Command selfDestruct");

    let response = facade.handle("getData", "", "DELETE").await;
    assert_eq!(response.status, 405);
    assert_eq!(text(&response), "ERROR - Unsupported Method Type DELETE");
}

#[tokio::test]
async fn test_image_requests_before_first_exposure() {
    let (facade, _client, _dir) = create_facade();

    for command in ["getImage", "getRoiImage", "getFrameHistogram", "getRoiYProfile"] {
        let response = facade.handle(command, "", "GET").await;
        assert_eq!(response, FacadeResponse::no_image(), "{}", command);
        assert_eq!(text(&response), NO_IMAGE_BODY);
    }
}

#[tokio::test]
async fn test_get_data_returns_status_document() {
    let (facade, _client, _dir) = create_facade();

    let response = facade.handle("getData", "", "GET").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body.content_type(), "application/json");

    let json: serde_json::Value = serde_json::from_str(text(&response)).unwrap();
    assert_eq!(json["statusVal"], 0);
    assert_eq!(json["exposureTime"], 0.5);
}

#[tokio::test]
async fn test_malformed_parameters_are_rejected() {
    let (facade, _client, _dir) = create_facade();

    for (command, value) in [
        ("setExposureTime", "fast"),
        ("setExposureTime", "-1"),
        ("setCooler", ""),
        ("setSubFrame", "1,2,3,4"),
        ("setRoi", "a,b:c,d"),
        ("setProfileWidth", "3"),
        ("setProfileWidth", "-1,2"),
    ] {
        let response = facade.handle(command, value, "POST").await;
        assert_eq!(response.status, 400, "{} {}", command, value);
        assert!(text(&response).starts_with("ERROR - Invalid parameter"));
    }
}

#[tokio::test]
async fn test_geometry_commands_update_status() {
    let (facade, _client, _dir) = create_facade();

    let response = facade.handle("setSubFrame", "5,5:100,10", "POST").await;
    assert_eq!(response, FacadeResponse::ok());
    let response = facade.handle("setRoi", "1.7,2:4,4", "POST").await;
    assert_eq!(response, FacadeResponse::ok());

    let config = facade.session().camera_config();
    assert_eq!(config.sub_frame.to_string(), "5,5:35,10");
    assert_eq!(config.roi.to_string(), "1,2:4,4");

    facade.handle("clearRoi", "", "POST").await;
    assert_eq!(facade.session().camera_config().roi.to_string(), "0,0:35,10");

    facade.handle("clearSubFrame", "", "POST").await;
    assert_eq!(
        facade.session().camera_config().sub_frame.to_string(),
        "0,0:40,30"
    );
}

#[tokio::test]
async fn test_image_products_after_exposure() {
    let (facade, client, _dir) = create_facade();
    expose(&facade, &client).await;

    for command in [
        "getImage",
        "getRoiImage",
        "getFullImage",
        "getFrameHistogram",
        "getRoiHistogram",
        "getXProfile",
        "getYProfile",
        "getRoiXProfile",
        "getRoiYProfile",
    ] {
        let response = facade.handle(command, "", "GET").await;
        assert_eq!(response.status, 200, "{}", command);
        match &response.body {
            ResponseBody::Png(png) => assert!(png.starts_with(PNG_SIGNATURE), "{}", command),
            other => panic!("{} returned {:?}", command, other),
        }
    }

    let response = facade.handle("getRoiStats", "", "GET").await;
    let json: serde_json::Value = serde_json::from_str(text(&response)).unwrap();
    assert_eq!(json["stats"]["count"], 40 * 30);
    assert_eq!(json["stats"]["histogram"].as_array().unwrap().len(), 256);
}

#[tokio::test]
async fn test_save_and_auto_save_commands() {
    let (facade, client, dir) = create_facade();

    let response = facade.handle("saveImage", "dark", "POST").await;
    assert_eq!(response.status, 409);

    expose(&facade, &client).await;
    let response = facade.handle("saveImage", "dark", "POST").await;
    assert_eq!(response, FacadeResponse::ok());

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("dark_") && names[0].ends_with("_0.fits"));

    facade.handle("startAutoSave", "light", "POST").await;
    assert!(facade.session().camera_config().auto_save);
    facade.handle("stopAutoSave", "", "POST").await;
    assert!(!facade.session().camera_config().auto_save);
}

#[tokio::test]
async fn test_continuous_and_cooler_commands() {
    let (facade, client, _dir) = create_facade();

    let response = facade.handle("startContinuousExposures", "", "POST").await;
    assert_eq!(response, FacadeResponse::ok());
    assert!(facade.session().camera_config().continuous);
    assert_eq!(client.exposure_count(), 1);

    facade.handle("stopContinuousExposures", "", "POST").await;
    assert!(!facade.session().camera_config().continuous);

    assert_eq!(
        facade.handle("setCooler", "-5.5", "POST").await,
        FacadeResponse::ok()
    );
    assert_eq!(facade.session().camera_config().cooler_setpoint, -5.5);
    assert_eq!(
        facade.handle("stopCooler", "", "POST").await,
        FacadeResponse::ok()
    );
    assert!(!facade.session().camera_config().cooler_enabled);

    assert_eq!(
        facade.handle("setProfileWidth", "3,4", "POST").await,
        FacadeResponse::ok()
    );
}

#[tokio::test]
async fn test_fatal_lazy_connect_becomes_error_response() {
    let client: Arc<dyn DeviceClient> =
        Arc::new(SimulatedClient::builder().reachable(false).build());
    let mut config = CcdConfig::default();
    config.retry.interval_ms = 1;
    let session = SessionController::from_config(&config, client);
    let facade = CommandFacade::new(session, &config.analysis);

    let response = facade.handle("startExposure", "", "POST").await;
    assert_eq!(response.status, 500);
    assert!(text(&response).contains("Fatal connection error"));

    // Status queries keep working
    let response = facade.handle("getData", "", "GET").await;
    assert_eq!(response.status, 200);
}
