//! Integration tests for container creation against a live engine.
//!
//! Each test creates a container from normalized options, reads back what
//! the engine recorded, and where it matters runs the container to check
//! what the process inside actually sees.
//! Tests are skipped if Docker/Podman is not available or SKIP_CONTAINER_TESTS=1.

use podnorm::container::{ContainerAttrs, ContainerClient, RuntimeType};
use podnorm::env::test::{SKIP_CONTAINER_TESTS_VAR, TEST_IMAGE};
use podnorm::normalize::{
    CreateOptions, CreateRequestBuilder, MountSpec, NormalizerConfig, SizeSpec, VolumeSpec,
};
use podnorm::verify::{
    MemoryField, RuntimeProbe, verify_all, verify_memory, verify_tmpfs,
};
use serial_test::serial;
use test_tag::tag;

/// Check if container tests should run.
fn should_run_container_tests() -> bool {
    if let Ok(value) = std::env::var(SKIP_CONTAINER_TESTS_VAR)
        && (value == "1" || value.eq_ignore_ascii_case("true"))
    {
        return false;
    }

    std::process::Command::new("docker")
        .arg("info")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
        || std::process::Command::new("podman")
            .arg("info")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
}

/// Create a container, hand its attributes to `check`, always remove it.
async fn with_container<F>(client: &ContainerClient, options: &CreateOptions, check: F)
where
    F: FnOnce(&str, &ContainerAttrs),
{
    let request = CreateRequestBuilder::new(TEST_IMAGE)
        .options(options.clone())
        .build()
        .expect("options should normalize");
    let id = client
        .create_container(&request)
        .await
        .expect("Failed to create container");

    let attrs = client.inspect_attrs(&id).await;
    if let Ok(attrs) = &attrs {
        check(&id, attrs);
    }

    let _ = client.remove_container(&id, true).await;
    attrs.expect("Failed to inspect container");
}

/// Run `probe` in a container created from `options` and check its output.
async fn run_probe(client: &ContainerClient, options: &CreateOptions, probe: RuntimeProbe) {
    let mut options = options.clone();
    options.command = Some(probe.command());

    let request = CreateRequestBuilder::new(TEST_IMAGE)
        .options(options.clone())
        .build()
        .expect("options should normalize");
    let id = client
        .create_container(&request)
        .await
        .expect("Failed to create container");

    let output = client.run_to_completion(&id).await;
    let _ = client.remove_container(&id, true).await;

    let output = output.expect("Failed to run container");
    assert_eq!(output.exit_code, 0, "{} probe failed:\n{}", probe, output.logs);
    probe
        .check(&output.logs, &options)
        .unwrap_or_else(|e| panic!("{} probe mismatch: {}\n{}", probe, e, output.logs));
}

async fn connect() -> ContainerClient {
    ContainerClient::new().await.expect("Failed to connect")
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_container_client_connection() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests (Docker/Podman not available or SKIP_CONTAINER_TESTS=1)");
        return;
    }

    let client = connect().await;
    let runtime = client.runtime_type().await.expect("Failed to get runtime type");
    assert!(matches!(runtime, RuntimeType::Docker | RuntimeType::Podman));
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_container_extra_hosts() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    let client = connect().await;
    let mut options = CreateOptions::default();
    options
        .extra_hosts
        .insert("host1 host3".to_string(), "127.0.0.2".to_string());
    options
        .extra_hosts
        .insert("host2".to_string(), "127.0.0.3".to_string());

    with_container(&client, &options, |_, attrs| {
        let report = verify_all(attrs, &options, &NormalizerConfig::default());
        assert!(report.is_ok(), "{}", report);
    })
    .await;

    run_probe(&client, &options, RuntimeProbe::Hosts).await;
}

/// Values accepted for every memory field, with the bytes the engine must store.
fn memory_cases() -> Vec<(SizeSpec, i64)> {
    vec![
        (SizeSpec::from(1000i64), 1000),
        (SizeSpec::from("1000"), 1000),
        (SizeSpec::from("1234b"), 1234),
        (SizeSpec::from("123k"), 123 * 1024),
        (SizeSpec::from("44m"), 44 * 1024 * 1024),
        (SizeSpec::from("2g"), 2 * 1024 * 1024 * 1024),
    ]
}

/// Create one container per memory case with `field` set, checking what the
/// engine recorded. Swap limits also get a `mem_limit` 100 bytes lower.
async fn check_memory_field(client: &ContainerClient, field: MemoryField) {
    for (value, expected) in memory_cases() {
        let mut options = CreateOptions::default();
        match field {
            MemoryField::Memory => options.mem_limit = Some(value.clone()),
            MemoryField::MemorySwap => {
                options.memswap_limit = Some(value.clone());
                options.mem_limit = Some(SizeSpec::from(expected - 100));
            }
            MemoryField::MemoryReservation => options.mem_reservation = Some(value.clone()),
            MemoryField::ShmSize => options.shm_size = Some(value.clone()),
        }

        with_container(client, &options, |_, attrs| {
            verify_memory(attrs, field, &value)
                .unwrap_or_else(|e| panic!("{} {:?}: {}", field.as_str(), value, e));
            let report = verify_all(attrs, &options, &NormalizerConfig::default());
            assert!(report.is_ok(), "{} {:?}\n{}", field.as_str(), value, report);
        })
        .await;
    }
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_container_mem_limit() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    check_memory_field(&connect().await, MemoryField::Memory).await;
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_container_memswap_limit() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    check_memory_field(&connect().await, MemoryField::MemorySwap).await;
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_container_mem_reservation() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    check_memory_field(&connect().await, MemoryField::MemoryReservation).await;
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_container_shm_size() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    check_memory_field(&connect().await, MemoryField::ShmSize).await;
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_container_ports() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    let client = connect().await;
    let variants = [
        "[ports]\n\"97\" = \"43\"\n",
        "[ports]\n\"2/udp\" = { ip = \"127.0.0.1\", port = \"939\" }\n",
        "[ports]\n\"11123/tcp\" = [\"1123\", \"159\"]\n",
        "[ports]\n\"11123/tcp\" = [{ ip = \"127.0.0.1\", port = \"11123\" }, \"1123\"]\n",
    ];

    for variant in variants {
        let options = CreateOptions::from_toml_str(variant).unwrap();
        with_container(&client, &options, |_, attrs| {
            let report = verify_all(attrs, &options, &NormalizerConfig::default());
            assert!(report.is_ok(), "{}\n{}", variant, report);
        })
        .await;
    }
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_container_named_volumes() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    let client = connect().await;
    let mut options = CreateOptions::default();
    options.volumes.insert(
        "podnorm_test_bind_1".to_string(),
        VolumeSpec::new("/mnt/vol1").with_mode("rw"),
    );
    options.volumes.insert(
        "podnorm_test_bind_2".to_string(),
        VolumeSpec::new("/mnt/vol2").with_extended_mode(["ro", "noexec"]),
    );

    with_container(&client, &options, |_, attrs| {
        let report = verify_all(attrs, &options, &NormalizerConfig::default());
        assert!(report.is_ok(), "{}", report);
        assert_eq!(attrs.mounts().len(), 2);
    })
    .await;
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_container_mounts() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    let client = connect().await;

    let bind = CreateOptions {
        mounts: vec![MountSpec::Bind {
            source: "/etc/hosts".to_string(),
            target: "/test".to_string(),
            read_only: Some(true),
            relabel: Some("Z".to_string()),
            propagation: None,
        }],
        ..Default::default()
    };
    with_container(&client, &bind, |_, attrs| {
        let report = verify_all(attrs, &bind, &NormalizerConfig::default());
        assert!(report.is_ok(), "{}", report);
    })
    .await;

    let tmpfs = CreateOptions {
        mounts: vec![MountSpec::Tmpfs {
            source: Some("tmpfs".to_string()),
            target: "/test".to_string(),
            size: Some("456k".to_string()),
        }],
        ..Default::default()
    };
    with_container(&client, &tmpfs, |_, attrs| {
        verify_tmpfs(attrs, &tmpfs.mounts).unwrap();
    })
    .await;

    run_probe(&client, &tmpfs, RuntimeProbe::Tmpfs).await;
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_container_devices() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    let client = connect().await;
    let options = CreateOptions {
        devices: vec![
            "/dev/null:/dev/foo".to_string(),
            "/dev/zero:/dev/bar".to_string(),
        ],
        ..Default::default()
    };

    with_container(&client, &options, |_, attrs| {
        let report = verify_all(attrs, &options, &NormalizerConfig::default());
        assert!(report.is_ok(), "{}", report);
    })
    .await;

    run_probe(&client, &options, RuntimeProbe::Devices).await;
}
