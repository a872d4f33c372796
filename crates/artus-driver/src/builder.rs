//! Builder 模式实现
//!
//! 按配置选择物理通道并创建 `Artus` 实例。

use crate::artus::{Artus, BoxedChannel};
use crate::config::{ChannelConfig, HandConfig};
use crate::error::DriverError;
use crate::models::{HandProduct, HandSide};
use artus_protocol::ProtocolRevision;
use artus_transport::{
    ChannelFault, ChannelFaultKind, DatagramChannel, RegisterBus, RegisterChannel, SerialSettings,
    TransportError, UdpDatagramBus,
};
use std::path::Path;
use tracing::{Span, info_span};

/// 串口总线工厂：按配置中的串口参数构造总线
type SerialBusFactory =
    Box<dyn FnOnce(&SerialSettings) -> Result<Box<dyn RegisterBus>, TransportError> + Send>;

/// Artus Builder（链式构造）
///
/// 串口通道需要调用方通过 [`register_bus`](Self::register_bus) 注入寄存器总线，
/// 或通过 [`serial_bus`](Self::serial_bus) 提供按串口参数构造总线的工厂。
/// 注入的总线优先于配置中的通道选择。
///
/// # Example
///
/// ```no_run
/// use artus_driver::{ArtusBuilder, HandProduct, HandSide};
///
/// let mut hand = ArtusBuilder::new()
///     .product(HandProduct::ArtusTalos)
///     .side(HandSide::Left)
///     .udp(Some("ArtusTalosLeft"), Some("password"))
///     .build()
///     .unwrap();
/// hand.connect().unwrap();
/// ```
pub struct ArtusBuilder {
    config: HandConfig,
    register_bus: Option<Box<dyn RegisterBus>>,
    serial_factory: Option<SerialBusFactory>,
    span: Option<Span>,
}

impl ArtusBuilder {
    pub fn new() -> Self {
        Self::from_config(HandConfig::default())
    }

    pub fn from_config(config: HandConfig) -> Self {
        Self {
            config,
            register_bus: None,
            serial_factory: None,
            span: None,
        }
    }

    /// 从 TOML 文件加载配置
    pub fn from_file(path: &Path) -> Result<Self, DriverError> {
        Ok(Self::from_config(HandConfig::load(path)?))
    }

    pub fn product(mut self, product: HandProduct) -> Self {
        self.config.product = product;
        self
    }

    pub fn side(mut self, side: HandSide) -> Self {
        self.config.side = side;
        self
    }

    pub fn revision(mut self, revision: ProtocolRevision) -> Self {
        self.config.revision = revision;
        self
    }

    /// 最大指令频率（Hz）
    pub fn frequency(mut self, frequency_hz: f64) -> Self {
        self.config.frequency_hz = frequency_hz;
        self
    }

    /// 设备已唤醒，连接时不再发送唤醒指令
    pub fn awake(mut self, awake: bool) -> Self {
        self.config.awake = awake;
        self
    }

    /// 使用 Wi-Fi + UDP 通道
    pub fn udp(mut self, ssid: Option<&str>, password: Option<&str>) -> Self {
        self.config.channel = ChannelConfig::Udp {
            ssid: ssid.map(str::to_string),
            password: password.map(str::to_string),
            local_port: artus_transport::udp::DEFAULT_LOCAL_PORT,
            device_port: artus_transport::udp::DEFAULT_DEVICE_PORT,
            side_tag: None,
        };
        self
    }

    /// 设备发现时要求问候语包含的标记（仅 UDP 通道）
    pub fn side_tag(mut self, tag: &str) -> Self {
        if let ChannelConfig::Udp { side_tag, .. } = &mut self.config.channel {
            *side_tag = Some(tag.to_string());
        }
        self
    }

    /// 使用串口通道
    pub fn serial(mut self, port: &str, baud_rate: u32, slave_address: u8) -> Self {
        self.config.channel = ChannelConfig::Serial {
            port: port.to_string(),
            baud_rate,
            slave_address,
        };
        self
    }

    /// 注入寄存器总线（串口实现或模拟总线）
    pub fn register_bus<B: RegisterBus + 'static>(mut self, bus: B) -> Self {
        self.register_bus = Some(Box::new(bus));
        self
    }

    /// 串口总线工厂，`build()` 时以配置中的串口参数调用
    pub fn serial_bus<F, B>(mut self, factory: F) -> Self
    where
        F: FnOnce(&SerialSettings) -> Result<B, TransportError> + Send + 'static,
        B: RegisterBus + 'static,
    {
        self.serial_factory = Some(Box::new(move |settings: &SerialSettings| {
            factory(settings).map(|bus| Box::new(bus) as Box<dyn RegisterBus>)
        }));
        self
    }

    /// 自定义日志上下文（默认 `artus{product, side}`）
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn config(&self) -> &HandConfig {
        &self.config
    }

    /// 构建 `Artus` 实例（不打开通道）
    ///
    /// # Errors
    /// - `DriverError::Config`: 配置校验失败
    /// - `DriverError::Transport`: 串口通道未注入寄存器总线，或总线工厂失败
    pub fn build(self) -> Result<Artus<BoxedChannel>, DriverError> {
        let config = self.config;
        config.validate()?;
        let span = self.span.unwrap_or_else(|| {
            info_span!("artus", product = %config.product, side = %config.side)
        });

        let channel: BoxedChannel = match (self.register_bus, self.serial_factory) {
            (Some(bus), _) => Box::new(RegisterChannel::new(bus)),
            (None, factory) => match (config.channel.serial_settings(), factory) {
                (Some(settings), Some(factory)) => {
                    Box::new(RegisterChannel::new(factory(&settings)?))
                },
                (Some(settings), None) => {
                    let fault = ChannelFault::new(
                        ChannelFaultKind::NotFound,
                        format!("no register bus provided for serial port {}", settings.port),
                    );
                    return Err(TransportError::from(fault).into());
                },
                (None, _) => {
                    let udp = config.channel.udp_config().unwrap_or_default();
                    Box::new(DatagramChannel::new(UdpDatagramBus::new(udp)))
                },
            },
        };

        Artus::new(config, channel, span)
    }
}

impl Default for ArtusBuilder {
    fn default() -> Self {
        Self::new()
    }
}
