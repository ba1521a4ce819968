// ABOUTME: Password-auth OpenSSH container shared by the integration tests.
// ABOUTME: Docker picks the host port; readiness is a successful rexec login.

use bollard::Docker;
use bollard::models::{ContainerCreateBody, HostConfig, PortBinding};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions,
};
use futures::StreamExt;
use rexec::config::{Config, Target};
use rexec::ssh::{Session, SessionConfig};
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const IMAGE: &str = "lscr.io/linuxserver/openssh-server:latest";
const SSH_PORT_KEY: &str = "2222/tcp";
pub const TEST_USER: &str = "testuser";
pub const TEST_PASSWORD: &str = "testpass";

static CONTAINER_ID: OnceLock<String> = OnceLock::new();

#[ctor::dtor]
fn remove_container_on_exit() {
    let Some(id) = CONTAINER_ID.get() else {
        return;
    };
    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return;
    };
    rt.block_on(async {
        if let Ok(docker) = Docker::connect_with_local_defaults() {
            let _ = docker
                .remove_container(
                    id,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await;
        }
    });
}

static SHARED_CONTAINER: tokio::sync::OnceCell<SshContainer> = tokio::sync::OnceCell::const_new();

/// The shared SSH container, started on first use.
pub async fn shared_container() -> &'static SshContainer {
    SHARED_CONTAINER
        .get_or_init(|| async {
            SshContainer::start()
                .await
                .expect("failed to start SSH container")
        })
        .await
}

pub struct SshContainer {
    port: u16,
}

impl SshContainer {
    async fn start() -> Result<Self, BoxError> {
        let docker = Docker::connect_with_local_defaults()?;

        let mut pull = docker.create_image(
            Some(CreateImageOptions {
                from_image: Some(IMAGE.to_string()),
                ..Default::default()
            }),
            None,
            None,
        );
        while let Some(progress) = pull.next().await {
            progress?;
        }

        // An empty host port lets Docker choose a free one.
        let port_bindings = HashMap::from([(
            SSH_PORT_KEY.to_string(),
            Some(vec![PortBinding {
                host_ip: Some("127.0.0.1".to_string()),
                host_port: Some(String::new()),
            }]),
        )]);

        let body = ContainerCreateBody {
            image: Some(IMAGE.to_string()),
            env: Some(vec![
                "PUID=1000".to_string(),
                "PGID=1000".to_string(),
                "PASSWORD_ACCESS=true".to_string(),
                format!("USER_NAME={TEST_USER}"),
                format!("USER_PASSWORD={TEST_PASSWORD}"),
            ]),
            exposed_ports: Some(vec![SSH_PORT_KEY.to_string()]),
            host_config: Some(HostConfig {
                port_bindings: Some(port_bindings),
                ..Default::default()
            }),
            ..Default::default()
        };

        let created = docker
            .create_container(
                Some(CreateContainerOptions {
                    name: Some(format!("rexec-ssh-test-{}", std::process::id())),
                    ..Default::default()
                }),
                body,
            )
            .await?;
        let _ = CONTAINER_ID.set(created.id.clone());

        docker
            .start_container(&created.id, None::<StartContainerOptions>)
            .await?;

        let port = published_port(&docker, &created.id).await?;
        wait_for_login(port).await?;

        Ok(Self { port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Config for running `command` against this container.
    ///
    /// Host keys are learned into `known_hosts` so the developer's own file
    /// is never touched.
    pub fn config(&self, command: &str, known_hosts: &Path) -> Config {
        self.config_with_password(command, TEST_PASSWORD, known_hosts)
    }

    pub fn config_with_password(&self, command: &str, password: &str, known_hosts: &Path) -> Config {
        let target = Target::new("127.0.0.1", self.port).expect("valid target");
        Config::new(
            target,
            TEST_USER,
            SecretString::new(password.to_string()),
            command,
        )
        .expect("valid config")
        .known_hosts_path(Some(known_hosts.to_path_buf()))
    }
}

/// Host port Docker bound to the container's SSH port.
async fn published_port(docker: &Docker, id: &str) -> Result<u16, BoxError> {
    let details = docker
        .inspect_container(id, None::<InspectContainerOptions>)
        .await?;
    let host_port = details
        .network_settings
        .and_then(|settings| settings.ports)
        .and_then(|mut ports| ports.remove(SSH_PORT_KEY))
        .flatten()
        .and_then(|bindings| bindings.into_iter().find_map(|binding| binding.host_port))
        .ok_or("SSH port was not published")?;
    Ok(host_port.parse()?)
}

/// Poll until the test user can log in. The port accepts connections
/// before sshd has finished creating the user.
async fn wait_for_login(port: u16) -> Result<(), BoxError> {
    let known_hosts = tempfile::NamedTempFile::new()?;
    let mut last_error = None;
    for _ in 0..60 {
        let config = SessionConfig::new(
            "127.0.0.1",
            TEST_USER,
            SecretString::new(TEST_PASSWORD.to_string()),
        )
        .port(port)
        .known_hosts_path(known_hosts.path())
        .connect_timeout(Some(Duration::from_secs(5)));
        match Session::connect(config).await {
            Ok(session) => {
                let _ = session.disconnect().await;
                return Ok(());
            }
            Err(e) => last_error = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    Err(format!("SSH container never accepted a login: {last_error:?}").into())
}
