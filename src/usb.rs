use embassy_stm32::usb_otg::{self, Driver};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    OTG_FS => usb_otg::InterruptHandler<peripherals::USB_OTG_FS>;
});

pub type UsbDriver = Driver<'static, peripherals::USB_OTG_FS>;
pub type UsbSerial = CdcAcmClass<'static, UsbDriver>;

/// Full-speed bulk endpoints
pub const MAX_PACKET: usize = 64;

/// Descriptor and control buffers; the device borrows them for its lifetime.
struct UsbBuffers {
    ep_out: [u8; 256],
    config_desc: [u8; 256],
    bos_desc: [u8; 256],
    control: [u8; 64],
}

static BUFFERS: StaticCell<UsbBuffers> = StaticCell::new();
static CDC_STATE: StaticCell<State<'static>> = StaticCell::new();

#[embassy_executor::task]
pub async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    device.run().await
}

/// CDC-ACM console on the OTG_FS port (DP=PA12, DM=PA11). Call once.
pub fn init(
    otg: peripherals::USB_OTG_FS,
    dp: peripherals::PA12,
    dm: peripherals::PA11,
) -> (UsbDevice<'static, UsbDriver>, UsbSerial) {
    let UsbBuffers {
        ep_out,
        config_desc,
        bos_desc,
        control,
    } = BUFFERS.init(UsbBuffers {
        ep_out: [0; 256],
        config_desc: [0; 256],
        bos_desc: [0; 256],
        control: [0; 64],
    });

    let mut otg_config = usb_otg::Config::default();
    otg_config.vbus_detection = false;
    let driver = Driver::new_fs(otg, Irqs, dp, dm, ep_out, otg_config);

    let mut config = Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("quad-flight");
    config.product = Some("Quadrotor flight controller");
    config.serial_number = Some("00000001");

    let mut builder = Builder::new(
        driver,
        config,
        config_desc,
        bos_desc,
        &mut [], // no MS OS descriptors
        control,
    );

    let class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), MAX_PACKET as u16);
    (builder.build(), class)
}
