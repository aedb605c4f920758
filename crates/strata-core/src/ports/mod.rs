//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! facade はここにある trait にだけ依存し、実装の詳細（ディスク、S3、認可サービス）を知りません。
//!
//! - StorageBackend: Blob ストレージ（外部コラボレータ）
//! - NamespaceAccessGuard: namespace 間アクセスの認可（外部コラボレータ）
//! - Clock: TTL 判定用の時刻

pub mod access_guard;
pub mod clock;
pub mod storage_backend;

pub use self::access_guard::NamespaceAccessGuard;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::storage_backend::{ByteStream, StorageBackend};
