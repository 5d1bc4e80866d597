use super::*;
use crate::error::DeviceError;
use crate::payload::{FitsDecoder, PayloadDecoder};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const CAMERA: &str = "CCD Simulator";

async fn connected_camera(client: &SimulatedClient) -> DeviceHandle {
    client.connect_server("localhost", 7624).await.unwrap();
    let camera = client.find_device(CAMERA).await.unwrap();
    let connection = client
        .find_property(&camera, properties::CONNECTION)
        .await
        .unwrap();
    client
        .set_switch(&connection, properties::CONNECT)
        .await
        .unwrap();
    camera
}

#[tokio::test]
async fn test_resolve_with_retry_succeeds_after_polling() {
    let calls = AtomicU32::new(0);

    let result = resolve_with_retry("widget", 5, Duration::from_millis(1), || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move { (n >= 3).then_some(n) }
    })
    .await;

    assert_eq!(result, Ok(3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_resolve_with_retry_times_out() {
    let calls = AtomicU32::new(0);

    let result: Result<(), DeviceError> =
        resolve_with_retry("CCD_FRAME", 4, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;

    assert_eq!(
        result,
        Err(DeviceError::ResolveTimeout {
            what: "CCD_FRAME".to_string(),
            attempts: 4
        })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_unreachable_server() {
    let client = SimulatedClient::builder().reachable(false).build();
    let result = client.connect_server("localhost", 7624).await;
    assert!(matches!(result, Err(DeviceError::ServerUnreachable { port: 7624, .. })));
    assert!(client.find_device(CAMERA).await.is_none());
}

#[tokio::test]
async fn test_properties_published_after_connect() {
    let client = SimulatedClient::builder().build();
    client.connect_server("localhost", 7624).await.unwrap();
    let camera = client.find_device(CAMERA).await.unwrap();

    assert!(!client.is_device_connected(&camera).await);
    assert!(client
        .find_property(&camera, properties::CCD_EXPOSURE)
        .await
        .is_none());

    let camera = connected_camera(&client).await;
    assert!(client.is_device_connected(&camera).await);

    let info = client
        .find_property(&camera, properties::CCD_INFO)
        .await
        .unwrap();
    let values = client.number_values(&info).await.unwrap();
    assert_eq!(&values[..2], &[1024.0, 768.0]);
}

#[tokio::test]
async fn test_appearance_delay_and_missing_devices() {
    let client = SimulatedClient::builder()
        .appearance_delay(Duration::from_millis(30))
        .missing_device(TELESCOPE_SIMULATOR)
        .build();
    client.connect_server("localhost", 7624).await.unwrap();

    assert!(client.find_device(CAMERA).await.is_none());

    let found = resolve_with_retry(CAMERA, 50, Duration::from_millis(5), || {
        client.find_device(CAMERA)
    })
    .await;
    assert!(found.is_ok());
    assert!(client.find_device(TELESCOPE_SIMULATOR).await.is_none());
}

#[tokio::test]
async fn test_manual_delivery_of_exposure() {
    let client = SimulatedClient::builder()
        .sensor_size(64, 48)
        .auto_deliver(false)
        .build();
    let camera = connected_camera(&client).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    client
        .enable_payloads(&camera, properties::CCD1, tx)
        .await
        .unwrap();

    let frame = client
        .find_property(&camera, properties::CCD_FRAME)
        .await
        .unwrap();
    client
        .set_numbers(&frame, &[8.0, 4.0, 16.0, 10.0])
        .await
        .unwrap();

    let exposure = client
        .find_property(&camera, properties::CCD_EXPOSURE)
        .await
        .unwrap();
    client.set_numbers(&exposure, &[0.5]).await.unwrap();

    assert_eq!(client.exposure_count(), 1);
    assert_eq!(client.pending_count(), 1);
    assert!(rx.try_recv().is_err());

    assert!(client.deliver_next());
    assert!(!client.deliver_next());

    let payload = rx.recv().await.unwrap();
    assert_eq!(payload.device, CAMERA);
    assert_eq!(payload.property, properties::CCD1);

    let pixels = FitsDecoder::new()
        .decode(&payload.format, &payload.data)
        .unwrap();
    assert_eq!(pixels.dim(), (10, 16));
    assert!(pixels.iter().all(|&v| v >= 1000));
}

#[tokio::test]
async fn test_auto_delivery_and_cooler_switch() {
    let client = SimulatedClient::builder()
        .sensor_size(32, 32)
        .exposure_scale(0.0)
        .build();
    let camera = connected_camera(&client).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    client
        .enable_payloads(&camera, properties::CCD1, tx)
        .await
        .unwrap();

    let exposure = client
        .find_property(&camera, properties::CCD_EXPOSURE)
        .await
        .unwrap();
    client.set_numbers(&exposure, &[1.0]).await.unwrap();

    let payload = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload.format, ".fits");

    let cooler = client
        .find_property(&camera, properties::CCD_COOLER)
        .await
        .unwrap();
    client
        .set_switch(&cooler, properties::COOLER_ON)
        .await
        .unwrap();
    assert_eq!(
        client.switch(CAMERA, properties::CCD_COOLER),
        Some(properties::COOLER_ON)
    );
}

#[tokio::test]
async fn test_hidden_property_is_not_found() {
    let client = SimulatedClient::builder().build();
    let camera = connected_camera(&client).await;

    client.hide_property(properties::CCD_FRAME);
    assert!(client
        .find_property(&camera, properties::CCD_FRAME)
        .await
        .is_none());

    client.show_property(properties::CCD_FRAME);
    assert!(client
        .find_property(&camera, properties::CCD_FRAME)
        .await
        .is_some());
}
