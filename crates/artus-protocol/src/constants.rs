//! 协议常量定义

/// 控制操作码：唤醒（启动执行器初始化）
pub const OPCODE_START: u8 = 0x58;
/// 控制操作码：标定（参数为关节号，0 表示全部）
pub const OPCODE_CALIBRATE: u8 = 0x37;
/// 控制操作码：休眠
pub const OPCODE_SLEEP: u8 = 0x19;
/// 控制操作码：手动置零
pub const OPCODE_SET_ZERO: u8 = 0x1E;
/// 控制操作码：进入固件升级（参数为烧录目标）
pub const OPCODE_FIRMWARE_UPDATE: u8 = 0x34;
/// 控制操作码：复位执行器
pub const OPCODE_RESET: u8 = 0x65;
/// 控制操作码：请求反馈
pub const OPCODE_GET_FEEDBACK: u8 = 0x14;

/// 固件数据突发的首字（替代起始地址，由从站识别为固件数据）
pub const FIRMWARE_DATA_OPCODE: u16 = OPCODE_FIRMWARE_UPDATE as u16;

/// 固件页大小（字节）
pub const FIRMWARE_PAGE_SIZE: usize = 256;
/// 单次突发写入的字节数
pub const FIRMWARE_BURST_SIZE: usize = 128;
/// 每页的突发次数
pub const FIRMWARE_BURSTS_PER_PAGE: usize = FIRMWARE_PAGE_SIZE / FIRMWARE_BURST_SIZE;
/// 单次突发写入的字数
pub const FIRMWARE_WORDS_PER_BURST: usize = FIRMWARE_BURST_SIZE / 2;
/// 固件镜像末尾填充字节
pub const FIRMWARE_PAD_BYTE: u8 = 0xFF;

/// 烧录目标：全部执行器（单个执行器为 0..=5）
pub const FLASH_TARGET_ALL: u8 = 6;

/// 位置打包允许的最小角度值
pub const POSITION_MIN: i8 = i8::MIN;
/// 位置打包允许的最大角度值
pub const POSITION_MAX: i8 = i8::MAX;
