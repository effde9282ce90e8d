// ── Connector orchestration ──
//
// One Connector per switch. Sequences a poll cycle -- ensure session,
// fetch pages, parse, normalize, emit metrics -- and owns all mutable
// per-device state: the session client, the cached metadata, and the
// previous-sample baseline. Strictly sequential: one request in
// flight, a pacing delay between dependent fetches (the embedded HTTP
// stack drops responses without it). Polling N switches means N
// independent Connectors.

use std::time::Instant;

use tracing::{debug, warn};

use plusmon_api::{
    Error, ModelDescriptor, PageParser, PortPower, SwitchClient, SwitchMetadata, Template,
};

use crate::config::ConnectorConfig;
use crate::error::CoreError;
use crate::metrics::{PoeStatus, PortLink, SampleBaseline, SnapshotMetadata, SwitchSnapshot};
use crate::normalize::normalize;
use crate::token_cache::CachedToken;

/// Literal body a control endpoint answers when it accepted the
/// request; anything else is a logged failure, not an error.
const CONTROL_SUCCESS: &str = "SUCCESS";

/// Polling and control connector for one switch.
pub struct Connector {
    config: ConnectorConfig,
    client: SwitchClient,
    metadata: Option<SwitchMetadata>,
    led_on: Option<bool>,
    baseline: Option<SampleBaseline>,
    last_cycle: Option<Instant>,
}

impl Connector {
    pub fn new(config: ConnectorConfig) -> Result<Self, CoreError> {
        let client = match &config.offline_dir {
            Some(dir) => {
                SwitchClient::offline(config.host.clone(), config.password.clone(), dir.clone())?
            }
            None => {
                SwitchClient::new(config.host.clone(), config.password.clone(), config.timeout())?
            }
        };
        debug!(host = %config.host, "connector created");
        Ok(Self {
            config,
            client,
            metadata: None,
            led_on: None,
            baseline: None,
            last_cycle: None,
        })
    }

    pub fn host(&self) -> &str {
        self.client.host()
    }

    /// Detect the switch model (no-op when already bound).
    pub async fn detect(&mut self) -> Result<&'static ModelDescriptor, CoreError> {
        Ok(self.client.detect().await?)
    }

    /// Stable identifier for this device.
    pub async fn unique_id(&mut self) -> Result<String, CoreError> {
        Ok(self.client.unique_id().await?)
    }

    /// The session client, for callers that need auth-level state.
    pub fn client(&self) -> &SwitchClient {
        &self.client
    }

    // ── Session persistence ──────────────────────────────────────────

    /// Current session token for persisting across restarts.
    pub fn session_cookie(&self) -> Option<CachedToken> {
        self.client.cookie().map(|(name, value)| CachedToken {
            host: self.config.host.clone(),
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }

    /// Seed a persisted session token; a stale one fails the expiry
    /// check on first use and re-login takes over.
    pub fn resume_session(&mut self, token: &CachedToken) {
        self.client.set_cookie(token.name.clone(), token.value.clone());
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Run one full poll cycle and return the snapshot.
    ///
    /// Metadata is fetched once and cached across cycles; counters are
    /// normalized against the baseline of the previous successful
    /// cycle, which this cycle's sample then replaces.
    pub async fn poll(&mut self) -> Result<SwitchSnapshot, CoreError> {
        let descriptor = self.client.detect().await?;

        if self.metadata.is_none() {
            self.load_metadata(descriptor).await?;
            self.pace().await;
        }

        // Port link status.
        let status_page = self.client.fetch_first(descriptor.status).await?;
        let links: Vec<PortLink> = self
            .parser()?
            .parse_link_status(&status_page.body, descriptor.ports)
            .iter()
            .map(PortLink::from_raw)
            .collect();

        self.pace().await;

        // Port statistics. Elapsed time is measured between the starts
        // of consecutive counter fetches; offline replay has no
        // meaningful clock and forces zero.
        let cycle_start = Instant::now();
        let elapsed = if self.client.is_offline() {
            0.0
        } else {
            self.last_cycle
                .map(|t| cycle_start.duration_since(t).as_secs_f64())
                .unwrap_or(0.0)
        };
        let stats_page = self.client.fetch_first(descriptor.statistics).await?;
        let sample = self
            .parser()?
            .parse_counters(&stats_page.body, descriptor.ports)?;

        let (metrics, new_baseline) = normalize(&sample, &links, self.baseline.as_ref(), elapsed);

        // PoE pages; partially supported models stop after counters.
        let poe = if descriptor.supported && !descriptor.poe_ports.is_empty() {
            self.pace().await;
            let config_page = self.client.fetch_first(descriptor.poe_config).await?;
            let active = self.parser()?.parse_poe_config(&config_page.body);
            self.pace().await;
            let poe_status_page = self.client.fetch_first(descriptor.poe_status).await?;
            let output_power_w = self.parser()?.parse_poe_status(&poe_status_page.body);
            Some(PoeStatus {
                active,
                output_power_w,
            })
        } else {
            None
        };

        // The baseline is replaced only at the end of a successful
        // cycle; any error above leaves the previous one in place.
        self.baseline = Some(new_baseline);
        self.last_cycle = Some(cycle_start);

        let metadata = match &self.metadata {
            Some(meta) => SnapshotMetadata::new(&self.config.host, descriptor.name, meta),
            None => SnapshotMetadata::new(
                &self.config.host,
                descriptor.name,
                &SwitchMetadata {
                    name: String::new(),
                    serial: "unknown".into(),
                    firmware: "unknown".into(),
                    bootloader: "unknown".into(),
                },
            ),
        };

        debug!(
            host = %self.config.host,
            model = descriptor.name,
            response_time_s = metrics.response_time_s,
            "poll cycle complete"
        );
        Ok(SwitchSnapshot {
            metadata,
            metrics,
            led_on: self.led_on,
            poe,
        })
    }

    async fn load_metadata(&mut self, descriptor: &'static ModelDescriptor) -> Result<(), CoreError> {
        let page = self.client.fetch_first(descriptor.info).await?;
        if page.body.is_empty() {
            warn!(host = %self.config.host, "info page was empty; metadata unavailable");
            return Ok(());
        }
        let body = page.body;

        if let Some(hash) = self.parser()?.parse_client_hash(&body) {
            self.client.set_client_hash(hash);
        }
        if descriptor.has_led_switch() {
            self.led_on = self.parser()?.parse_led_status(&body);
        }
        let metadata = self
            .client
            .parser_mut()
            .ok_or(CoreError::Api(Error::ModelNotDetected))?
            .parse_metadata(&body)?;
        debug!(
            host = %self.config.host,
            firmware = %metadata.firmware,
            serial = %metadata.serial,
            "switch metadata loaded"
        );
        self.metadata = Some(metadata);
        Ok(())
    }

    // ── Controls ─────────────────────────────────────────────────────

    /// Switch power delivery on one PoE port. `Ok(true)` only when the
    /// device acknowledged with the literal success body.
    pub async fn set_poe_port(&mut self, port: u8, state: PortPower) -> Result<bool, CoreError> {
        let descriptor = self.ensure_ready().await?;
        if !descriptor.is_poe_port(port) {
            return Err(CoreError::InvalidControlArgument {
                message: format!(
                    "port {port} is not a PoE port on {} (PoE ports: {:?})",
                    descriptor.name, descriptor.poe_ports
                ),
            });
        }
        let form = descriptor.poe_form.switch_form(port, state);
        self.submit_control(descriptor.poe_switch, &form, "poe port switch")
            .await
    }

    /// Power-cycle one PoE port.
    pub async fn cycle_poe_port(&mut self, port: u8) -> Result<bool, CoreError> {
        let descriptor = self.ensure_ready().await?;
        if !descriptor.is_poe_port(port) {
            return Err(CoreError::InvalidControlArgument {
                message: format!(
                    "port {port} is not a PoE port on {} (PoE ports: {:?})",
                    descriptor.name, descriptor.poe_ports
                ),
            });
        }
        let form = descriptor.poe_form.cycle_form(port, descriptor.poe_ports);
        self.submit_control(descriptor.poe_cycle, &form, "poe port cycle")
            .await
    }

    /// Switch the front panel LEDs on models that support it.
    pub async fn set_leds(&mut self, state: PortPower) -> Result<bool, CoreError> {
        let descriptor = self.ensure_ready().await?;
        if descriptor.led.is_empty() {
            return Err(CoreError::UnsupportedOperation("led switching"));
        }
        let form = descriptor.poe_form.led_form(state);
        let acknowledged = self
            .submit_control(descriptor.led, &form, "led switch")
            .await?;
        if acknowledged {
            // Drop cached metadata so the LED state refreshes on the
            // next poll.
            self.metadata = None;
        }
        Ok(acknowledged)
    }

    /// Reboot the switch. `Ok(false)` when no reboot endpoint answered.
    pub async fn reboot(&mut self) -> Result<bool, CoreError> {
        let descriptor = self.client.detect().await?;
        if descriptor.reboot.is_empty() {
            return Err(CoreError::UnsupportedOperation("reboot"));
        }
        match self.client.fetch_first(descriptor.reboot).await {
            Ok(_) => Ok(true),
            Err(Error::PageNotLoaded { context }) => {
                debug!(%context, "no reboot endpoint answered");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Log out and clear the session token.
    pub async fn logout(&mut self) -> Result<bool, CoreError> {
        Ok(self.client.logout().await?)
    }

    async fn submit_control(
        &mut self,
        templates: &'static [Template],
        form: &[(String, String)],
        context: &'static str,
    ) -> Result<bool, CoreError> {
        for template in templates {
            let response = self.client.fetch_page_with(template, form).await?;
            if response.is_ok() && response.body.trim() == CONTROL_SUCCESS {
                return Ok(true);
            }
            warn!(
                context,
                status = response.status,
                body = %response.body.trim(),
                "control request not acknowledged"
            );
        }
        Ok(false)
    }

    /// Detection plus the one-time metadata pass -- controls need the
    /// page hash some control templates embed.
    async fn ensure_ready(&mut self) -> Result<&'static ModelDescriptor, CoreError> {
        let descriptor = self.client.detect().await?;
        if self.metadata.is_none() {
            self.load_metadata(descriptor).await?;
        }
        Ok(descriptor)
    }

    fn parser(&self) -> Result<&PageParser, CoreError> {
        self.client
            .parser()
            .ok_or(CoreError::Api(Error::ModelNotDetected))
    }

    async fn pace(&self) {
        let pace = self.config.pace();
        if !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }
    }
}
