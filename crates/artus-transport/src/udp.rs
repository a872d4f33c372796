//! UDP 数据报总线
//!
//! 连接流程：
//! 1. 若未连接到目标无线网络，通过 `nmcli` 加入（仅 Linux）
//! 2. 向本机所在 /24 网段的 .1 ~ .254 广播探测报文，取第一个问候语匹配的应答者
//! 3. 绑定本地端口，发送握手报文

use crate::{ChannelFault, ChannelFaultKind, DatagramBus, TransportError};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 设备监听端口
pub const DEFAULT_DEVICE_PORT: u16 = 3210;
/// 本地绑定端口
pub const DEFAULT_LOCAL_PORT: u16 = 3211;
/// 设备问候语前缀
pub const GREETING_SIGNATURE: &[u8] = b"Sarcomere Dynamics";
/// 探测报文
pub const DISCOVERY_PROBE: &[u8] = b"?";
/// 握手报文
pub const HANDSHAKE: &[u8] = b"?\n";

/// UDP 通道配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpConfig {
    /// 目标无线网络名，`None` 表示不管理无线连接
    pub ssid: Option<String>,
    pub password: Option<String>,
    pub local_port: u16,
    pub device_port: u16,
    /// 问候语中需要包含的左右手标记
    pub side_tag: Option<String>,
    pub discovery_timeout: Duration,
    pub receive_timeout: Duration,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            ssid: None,
            password: None,
            local_port: DEFAULT_LOCAL_PORT,
            device_port: DEFAULT_DEVICE_PORT,
            side_tag: None,
            discovery_timeout: Duration::from_secs(1),
            receive_timeout: Duration::from_millis(100),
        }
    }
}

/// 网段内可探测的主机（.1 ~ .254）
pub fn subnet_hosts(local: Ipv4Addr) -> impl Iterator<Item = Ipv4Addr> {
    let [a, b, c, _] = local.octets();
    (1..=254u8).map(move |host| Ipv4Addr::new(a, b, c, host))
}

/// 问候语是否匹配签名（以及可选的左右手标记）
pub fn matches_greeting(reply: &[u8], side_tag: Option<&str>) -> bool {
    if !reply.starts_with(GREETING_SIGNATURE) {
        return false;
    }
    match side_tag {
        Some(tag) if !tag.is_empty() => reply
            .windows(tag.len())
            .any(|window| window.eq_ignore_ascii_case(tag.as_bytes())),
        _ => true,
    }
}

/// UDP 数据报总线
#[derive(Debug)]
pub struct UdpDatagramBus {
    config: UdpConfig,
    socket: Option<UdpSocket>,
    device: Option<SocketAddr>,
    joined_network: bool,
}

impl UdpDatagramBus {
    pub fn new(config: UdpConfig) -> Self {
        Self {
            config,
            socket: None,
            device: None,
            joined_network: false,
        }
    }

    /// 已发现的设备地址
    pub fn device(&self) -> Option<SocketAddr> {
        self.device
    }

    fn join_network(&mut self) -> Result<(), ChannelFault> {
        let Some(ssid) = self.config.ssid.as_deref() else {
            return Ok(());
        };
        if !cfg!(target_os = "linux") {
            warn!(ssid, "wireless association is only managed on Linux; assuming connected");
            return Ok(());
        }

        let active = Command::new("nmcli")
            .args(["-t", "-f", "active,ssid", "dev", "wifi"])
            .output()
            .map_err(|e| ChannelFault::new(ChannelFaultKind::NotFound, format!("nmcli: {e}")))?;
        let associated = String::from_utf8_lossy(&active.stdout)
            .lines()
            .any(|line| line.strip_prefix("yes:") == Some(ssid));
        if associated {
            debug!(ssid, "already associated with wireless network");
            return Ok(());
        }

        let mut connect = Command::new("nmcli");
        connect.args(["dev", "wifi", "connect", ssid]);
        if let Some(password) = self.config.password.as_deref() {
            connect.args(["password", password]);
        }
        let status = connect
            .status()
            .map_err(|e| ChannelFault::new(ChannelFaultKind::Io, format!("nmcli: {e}")))?;
        if !status.success() {
            return Err(ChannelFault::new(
                ChannelFaultKind::Network,
                format!("failed to join wireless network {ssid}"),
            ));
        }
        info!(ssid, "joined wireless network");
        self.joined_network = true;
        Ok(())
    }

    /// 本机 IPv4 地址（通过路由选择，不实际发包）
    fn local_ipv4() -> Result<Ipv4Addr, ChannelFault> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        match socket.local_addr()? {
            SocketAddr::V4(addr) => Ok(*addr.ip()),
            SocketAddr::V6(_) => Err(ChannelFault::new(
                ChannelFaultKind::Network,
                "no IPv4 route available",
            )),
        }
    }

    fn discover(&self, local: Ipv4Addr) -> Result<SocketAddr, ChannelFault> {
        let probe = UdpSocket::bind("0.0.0.0:0")?;
        probe.set_read_timeout(Some(Duration::from_millis(50)))?;
        for host in subnet_hosts(local) {
            let target = SocketAddrV4::new(host, self.config.device_port);
            if let Err(e) = probe.send_to(DISCOVERY_PROBE, target) {
                trace!(%target, error = %e, "probe not sent");
            }
        }

        let deadline = Instant::now() + self.config.discovery_timeout;
        let mut buf = [0u8; 256];
        while Instant::now() < deadline {
            match probe.recv_from(&mut buf) {
                Ok((n, from)) => {
                    if matches_greeting(&buf[..n], self.config.side_tag.as_deref()) {
                        info!(%from, "discovered hand");
                        return Ok(SocketAddr::new(from.ip(), self.config.device_port));
                    }
                    trace!(%from, "ignoring reply without greeting");
                },
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {},
                Err(e) => return Err(e.into()),
            }
        }

        Err(ChannelFault::new(
            ChannelFaultKind::Network,
            format!("no hand answered discovery on {local}/24"),
        ))
    }

    fn socket(&self) -> Result<(&UdpSocket, SocketAddr), TransportError> {
        match (&self.socket, self.device) {
            (Some(socket), Some(device)) => Ok((socket, device)),
            _ => Err(ChannelFault::closed().into()),
        }
    }
}

impl DatagramBus for UdpDatagramBus {
    fn open(&mut self) -> Result<(), TransportError> {
        self.join_network()?;
        let local = Self::local_ipv4()?;
        let device = self.discover(local)?;

        let socket = UdpSocket::bind(SocketAddrV4::new(local, self.config.local_port))
            .map_err(ChannelFault::from)?;
        socket
            .set_read_timeout(Some(self.config.receive_timeout))
            .map_err(ChannelFault::from)?;
        socket.send_to(HANDSHAKE, device).map_err(ChannelFault::from)?;

        self.socket = Some(socket);
        self.device = Some(device);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.socket = None;
        self.device = None;
        if self.joined_network {
            self.joined_network = false;
            if let Some(ssid) = self.config.ssid.as_deref() {
                let status = Command::new("nmcli")
                    .args(["con", "down", "id", ssid])
                    .status()
                    .map_err(|e| ChannelFault::new(ChannelFaultKind::Io, format!("nmcli: {e}")))?;
                if !status.success() {
                    warn!(ssid, "failed to leave wireless network");
                }
            }
        }
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let (socket, device) = self.socket()?;
        socket.send_to(bytes, device).map_err(ChannelFault::from)?;
        Ok(())
    }

    fn receive(&mut self, expected_size: usize) -> Result<Option<Vec<u8>>, TransportError> {
        let (socket, _) = self.socket()?;
        let mut buf = vec![0u8; expected_size];
        match socket.recv_from(&mut buf) {
            Ok((n, _)) if n >= expected_size => Ok(Some(buf)),
            Ok((n, _)) => {
                debug!(received = n, expected_size, "short datagram discarded");
                Ok(None)
            },
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(ChannelFault::from(e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnet_hosts() {
        let hosts: Vec<Ipv4Addr> = subnet_hosts(Ipv4Addr::new(192, 168, 4, 17)).collect();
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], Ipv4Addr::new(192, 168, 4, 1));
        assert_eq!(hosts[253], Ipv4Addr::new(192, 168, 4, 254));
    }

    #[test]
    fn test_greeting_match() {
        assert!(matches_greeting(b"Sarcomere Dynamics Artus", None));
        assert!(matches_greeting(b"Sarcomere Dynamics Artus right", Some("right")));
        assert!(!matches_greeting(b"Sarcomere Dynamics Artus left", Some("right")));
        assert!(!matches_greeting(b"hello", None));
    }

    #[test]
    fn test_closed_bus_reports_channel_fault() {
        let mut bus = UdpDatagramBus::new(UdpConfig::default());
        assert!(matches!(bus.send(b"x"), Err(TransportError::Channel(_))));
        assert!(matches!(bus.receive(65), Err(TransportError::Channel(_))));
    }

    #[test]
    fn test_short_datagram_discarded() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let local = UdpSocket::bind("127.0.0.1:0").unwrap();
        local
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut bus = UdpDatagramBus::new(UdpConfig::default());
        bus.device = Some(device.local_addr().unwrap());
        bus.socket = Some(local.try_clone().unwrap());

        device.send_to(&[1, 2, 3], local.local_addr().unwrap()).unwrap();
        assert_eq!(bus.receive(65).unwrap(), None);

        device.send_to(&[7u8; 65], local.local_addr().unwrap()).unwrap();
        assert_eq!(bus.receive(65).unwrap(), Some(vec![7u8; 65]));
    }
}
