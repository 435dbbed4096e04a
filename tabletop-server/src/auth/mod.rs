//! 认证授权模块
//!
//! - [`JwtService`] - 验证外部身份服务签发的 JWT
//! - [`Principal`] - 调用方 (顾客 / 服务员 / 经理 / 厨师)
//! - [`Action`] - 受保护的操作，`Principal::require` 做授权

pub mod extractor;
pub mod jwt;
pub mod principal;

pub use extractor::principal_from_headers;
pub use jwt::{Claims, DEV_JWT_SECRET, JwtConfig, JwtError, JwtService};
pub use principal::{Action, Principal};
