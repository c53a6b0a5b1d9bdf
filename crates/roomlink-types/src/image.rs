use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// 图像帧来源编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameEncoding {
    /// 原始二进制（JPEG）
    Raw,

    /// JSON 信封中的 `image` 字段
    EmbeddedInJson,
}

/// 图像帧，每次整体替换，不保留历史
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFrame {
    pub bytes: Vec<u8>,
    pub encoding: FrameEncoding,
    pub received_at: DateTime<Utc>,
}

impl ImageFrame {
    pub fn raw(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            encoding: FrameEncoding::Raw,
            received_at: Utc::now(),
        }
    }

    pub fn embedded(content: impl Into<String>) -> Self {
        Self {
            bytes: content.into().into_bytes(),
            encoding: FrameEncoding::EmbeddedInJson,
            received_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 内嵌帧的原始字符串内容
    pub fn embedded_content(&self) -> Option<&str> {
        match self.encoding {
            FrameEncoding::EmbeddedInJson => std::str::from_utf8(&self.bytes).ok(),
            FrameEncoding::Raw => None,
        }
    }

    /// 供展示层直接使用的图像地址
    ///
    /// 内嵌帧已是 `data:` 或 `http` 地址时原样透传，裸 base64 补上 JPEG 前缀。
    pub fn to_data_url(&self) -> String {
        match self.encoding {
            FrameEncoding::Raw => {
                format!("{}{}", JPEG_DATA_URL_PREFIX, STANDARD.encode(&self.bytes))
            }
            FrameEncoding::EmbeddedInJson => {
                let content = String::from_utf8_lossy(&self.bytes);
                if content.starts_with("data:") || content.starts_with("http") {
                    content.into_owned()
                } else {
                    format!("{}{}", JPEG_DATA_URL_PREFIX, content)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_frame_data_url() {
        let frame = ImageFrame::raw(vec![0xff, 0xd8, 0xff]);
        assert_eq!(frame.encoding, FrameEncoding::Raw);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.embedded_content(), None);
        assert_eq!(frame.to_data_url(), "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_embedded_bare_base64_gets_jpeg_prefix() {
        let frame = ImageFrame::embedded("AAA");
        assert_eq!(frame.embedded_content(), Some("AAA"));
        assert_eq!(frame.to_data_url(), "data:image/jpeg;base64,AAA");
    }

    #[test]
    fn test_embedded_url_passthrough() {
        let data_url = ImageFrame::embedded("data:image/png;base64,iVBO");
        assert_eq!(data_url.to_data_url(), "data:image/png;base64,iVBO");

        let remote = ImageFrame::embedded("https://cam.local/latest.jpg");
        assert_eq!(remote.to_data_url(), "https://cam.local/latest.jpg");
    }
}
