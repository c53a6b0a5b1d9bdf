use crate::error::{Result, TransportError};
use rumqttc::Transport;
use url::Url;

/// 代理传输方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Tcp,
    Tls,
    Ws,
    Wss,
}

/// 解析后的代理地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub kind: EndpointKind,
    pub host: String,
    pub port: u16,
    /// 原始地址，WebSocket 连接需要完整 URL
    pub url: String,
}

impl BrokerEndpoint {
    pub fn parse(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        let (kind, default_port) = match url.scheme() {
            "mqtt" | "tcp" => (EndpointKind::Tcp, 1883),
            "mqtts" | "ssl" => (EndpointKind::Tls, 8883),
            "ws" => (EndpointKind::Ws, 80),
            "wss" => (EndpointKind::Wss, 443),
            other => {
                return Err(TransportError::InvalidEndpoint(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TransportError::InvalidEndpoint(format!("{}: missing host", endpoint)))?
            .to_string();

        Ok(Self {
            kind,
            host,
            port: url.port().unwrap_or(default_port),
            url: endpoint.to_string(),
        })
    }

    /// rumqttc 连接参数中的 host 字段
    pub(crate) fn broker_addr(&self) -> &str {
        match self.kind {
            EndpointKind::Ws | EndpointKind::Wss => &self.url,
            EndpointKind::Tcp | EndpointKind::Tls => &self.host,
        }
    }

    pub(crate) fn transport(&self) -> Transport {
        match self.kind {
            EndpointKind::Tcp => Transport::Tcp,
            EndpointKind::Tls => Transport::tls_with_default_config(),
            EndpointKind::Ws => Transport::Ws,
            EndpointKind::Wss => Transport::wss_with_default_config(),
        }
    }
}
