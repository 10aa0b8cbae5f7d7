//! 请求行解析
//!
//! 只从客户端第一次读取的数据中提取 method 和 target，不解析 header 和 body

/// 首次读取客户端数据的缓冲区大小
pub const REQUEST_BUFFER_SIZE: usize = 1024;

/// CONNECT 方法
pub const METHOD_CONNECT: &str = "CONNECT";

/// 从请求首行中解析出的方法和目标
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    pub target: String,
}

impl ParsedRequest {
    /// 解析请求首行，不会失败：缺失的字段为空字符串
    pub fn parse(content: &[u8]) -> Self {
        let line = match content.iter().position(|&b| b == b'\n') {
            Some(i) => &content[..i],
            None => content,
        };

        let mut fields = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|field| !field.is_empty());

        let method = fields.next().map(lossy).unwrap_or_default();
        let target = fields.next().map(lossy).unwrap_or_default();

        Self { method, target }
    }

    pub fn is_connect(&self) -> bool {
        self.method == METHOD_CONNECT
    }
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}
