use std::{
    fs::File,
    io::{Cursor, Error, ErrorKind, Read, Result as IoResult},
    path::Path,
};

/// 待上传的本地文件描述
///
/// 维护分片上传的字节计数：
/// [`FileDescription::read_chunk`] 顺序读出下一个分片但不推进计数，
/// 分片确认发送成功后由 [`FileDescription::advance`] 推进。
/// 已发送字节数单调递增且永远不会超过文件总长。
pub struct FileDescription {
    reader: Box<dyn Read + Send>,
    file_name: String,
    total: u64,
    bytes_sent: u64,
}

impl FileDescription {
    /// 根据本地文件路径创建文件描述
    ///
    /// 文件名取路径的最后一段
    pub fn from_path(path: impl AsRef<Path>) -> IoResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let total = file.metadata()?.len();
        let file_name = path
            .file_name()
            .map(|file_name| file_name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            reader: Box::new(file),
            file_name,
            total,
            bytes_sent: 0,
        })
    }

    /// 根据数据流与总长度创建文件描述
    pub fn from_reader(
        reader: impl Read + Send + 'static,
        total: u64,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            file_name: file_name.into(),
            total,
            bytes_sent: 0,
        }
    }

    /// 根据内存中的数据创建文件描述
    pub fn from_bytes(data: Vec<u8>, file_name: impl Into<String>) -> Self {
        let total = data.len() as u64;
        Self {
            reader: Box::new(Cursor::new(data)),
            file_name: file_name.into(),
            total,
            bytes_sent: 0,
        }
    }

    /// 获取文件名
    #[inline]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// 获取文件总长度
    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// 获取已确认发送的字节数
    #[inline]
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// 是否已全部发送
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.bytes_sent >= self.total
    }

    /// 顺序读出下一个分片，长度不超过 `chunk_size` 与剩余字节数
    ///
    /// 不推进已发送字节数，分片发送成功后调用
    /// [`FileDescription::advance`] 确认。
    /// 数据流在达到声明的总长度之前提前结束时返回
    /// [`ErrorKind::UnexpectedEof`] 错误
    pub fn read_chunk(&mut self, chunk_size: u64) -> IoResult<Vec<u8>> {
        let remaining = self.total - self.bytes_sent;
        let to_read = remaining.min(chunk_size) as usize;
        let mut buffer = vec![0u8; to_read];
        let mut filled = 0;
        while filled < to_read {
            match self.reader.read(&mut buffer[filled..])? {
                0 => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEof,
                        format!(
                            "reader ended after {} bytes, {} bytes were declared",
                            self.bytes_sent + filled as u64,
                            self.total
                        ),
                    ))
                }
                n => filled += n,
            }
        }
        Ok(buffer)
    }

    /// 确认 `n` 个字节已发送成功，推进计数
    #[inline]
    pub fn advance(&mut self, n: u64) {
        self.bytes_sent = (self.bytes_sent + n).min(self.total);
    }
}

impl std::fmt::Debug for FileDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDescription")
            .field("file_name", &self.file_name)
            .field("total", &self.total)
            .field("bytes_sent", &self.bytes_sent)
            .finish()
    }
}

/// 上传来源
///
/// 远端 URL 作为来源时不经过分片协议，
/// 由服务端直接抓取
#[derive(Debug)]
#[non_exhaustive]
pub enum UploadSource {
    /// 本地文件或数据流
    Local(FileDescription),
    /// 远端 URL
    Remote(String),
}

impl From<FileDescription> for UploadSource {
    #[inline]
    fn from(file: FileDescription) -> Self {
        Self::Local(file)
    }
}

impl From<&str> for UploadSource {
    #[inline]
    fn from(url: &str) -> Self {
        Self::Remote(url.to_owned())
    }
}

impl From<String> for UploadSource {
    #[inline]
    fn from(url: String) -> Self {
        Self::Remote(url)
    }
}
