//! Fixed query text and compiled-in auth code for the status query.
//!
//! The gateway validates the query/signature pair as a unit: the GraphQL
//! document below must match the reference capture byte for byte, or the
//! precomputed DER signature no longer validates and the gateway answers
//! with a signature rejection instead of data.

/// The `DeviceControllerQuery` GraphQL document sent by every status query.
pub const DEVICE_CONTROLLER_QUERY: &str = r" query DeviceControllerQuery {
  control {
    systemStatus {
        nominalFullPackEnergyWh
        nominalEnergyRemainingWh
    }
    islanding {
        customerIslandMode
        contactorClosed
        microGridOK
        gridOK
    }
    meterAggregates {
      location
      realPowerW
    }
    alerts {
      active
    },
    siteShutdown {
      isShutDown
      reasons
    }
    batteryBlocks {
      din
      disableReasons
    }
    pvInverters {
      din
      disableReasons
    }
  }
  system {
    time
    sitemanagerStatus {
      isRunning
    }
    updateUrgencyCheck  {
      urgency
      version {
        version
        gitHash
      }
      timestamp
    }
  }
  neurio {
    isDetectingWiredMeters
    readings {
      serial
      dataRead {
        voltageV
        realPowerW
        reactivePowerVAR
        currentA
      }
      timestamp
    }
    pairings {
      serial
      shortId
      status
      errors
      macAddress
      isWired
      modbusPort
      modbusId
      lastUpdateTimestamp
    }
  }
  pw3Can {
    firmwareUpdate {
      isUpdating
      progress {
         updating
         numSteps
         currentStep
         currentStepProgress
         progress
      }
    }
  }
  esCan {
    bus {
      PVAC {
        packagePartNumber
        packageSerialNumber
        subPackagePartNumber
        subPackageSerialNumber
        PVAC_Status {
          isMIA
          PVAC_Pout
          PVAC_State
          PVAC_Vout
          PVAC_Fout
        }
        PVAC_InfoMsg {
          PVAC_appGitHash
        }
        PVAC_Logging {
          isMIA
          PVAC_PVCurrent_A
          PVAC_PVCurrent_B
          PVAC_PVCurrent_C
          PVAC_PVCurrent_D
          PVAC_PVMeasuredVoltage_A
          PVAC_PVMeasuredVoltage_B
          PVAC_PVMeasuredVoltage_C
          PVAC_PVMeasuredVoltage_D
          PVAC_VL1Ground
          PVAC_VL2Ground
        }
        alerts {
          isComplete
          isMIA
          active
        }
      }
      PINV {
        PINV_Status {
          isMIA
          PINV_Fout
          PINV_Pout
          PINV_Vout
          PINV_State
          PINV_GridState
        }
        PINV_AcMeasurements {
          isMIA
          PINV_VSplit1
          PINV_VSplit2
        }
        PINV_PowerCapability {
          isComplete
          isMIA
          PINV_Pnom
        }
        alerts {
          isComplete
          isMIA
          active
        }
      }
      PVS {
        PVS_Status {
          isMIA
          PVS_State
          PVS_vLL
          PVS_StringA_Connected
          PVS_StringB_Connected
          PVS_StringC_Connected
          PVS_StringD_Connected
          PVS_SelfTestState
        }
        alerts {
          isComplete
          isMIA
          active
        }
      }
      THC {
        packagePartNumber
        packageSerialNumber
        THC_InfoMsg {
          isComplete
          isMIA
          THC_appGitHash
        }
        THC_Logging {
          THC_LOG_PW_2_0_EnableLineState
        }
      }
      POD {
        POD_EnergyStatus {
          isMIA
          POD_nom_energy_remaining
          POD_nom_full_pack_energy
        }
        POD_InfoMsg {
            POD_appGitHash
        }
      }
      MSA {
        packagePartNumber
        packageSerialNumber
        MSA_InfoMsg {
          isMIA
          MSA_appGitHash
          MSA_assemblyId
        }
        METER_Z_AcMeasurements {
          isMIA
          lastRxTime
          METER_Z_CTA_InstRealPower
          METER_Z_CTA_InstReactivePower
          METER_Z_CTA_I
          METER_Z_VL1G
          METER_Z_CTB_InstRealPower
          METER_Z_CTB_InstReactivePower
          METER_Z_CTB_I
          METER_Z_VL2G
        }
        MSA_Status {
          lastRxTime
        }
      }
      SYNC {
        packagePartNumber
        packageSerialNumber
        SYNC_InfoMsg {
          isMIA
          SYNC_appGitHash
        }
        METER_X_AcMeasurements {
          isMIA
          isComplete
          lastRxTime
          METER_X_CTA_InstRealPower
          METER_X_CTA_InstReactivePower
          METER_X_CTA_I
          METER_X_VL1N
          METER_X_CTB_InstRealPower
          METER_X_CTB_InstReactivePower
          METER_X_CTB_I
          METER_X_VL2N
          METER_X_CTC_InstRealPower
          METER_X_CTC_InstReactivePower
          METER_X_CTC_I
          METER_X_VL3N
        }
        METER_Y_AcMeasurements {
          isMIA
          isComplete
          lastRxTime
          METER_Y_CTA_InstRealPower
          METER_Y_CTA_InstReactivePower
          METER_Y_CTA_I
          METER_Y_VL1N
          METER_Y_CTB_InstRealPower
          METER_Y_CTB_InstReactivePower
          METER_Y_CTB_I
          METER_Y_VL2N
          METER_Y_CTC_InstRealPower
          METER_Y_CTC_InstReactivePower
          METER_Y_CTC_I
          METER_Y_VL3N
        }
        SYNC_Status {
          lastRxTime
        }
      }
      ISLANDER {
        ISLAND_GridConnection {
          ISLAND_GridConnected
          isComplete
        }
        ISLAND_AcMeasurements {
          ISLAND_VL1N_Main
          ISLAND_FreqL1_Main
          ISLAND_VL2N_Main
          ISLAND_FreqL2_Main
          ISLAND_VL3N_Main
          ISLAND_FreqL3_Main
          ISLAND_VL1N_Load
          ISLAND_FreqL1_Load
          ISLAND_VL2N_Load
          ISLAND_FreqL2_Load
          ISLAND_VL3N_Load
          ISLAND_FreqL3_Load
          ISLAND_GridState
          lastRxTime
          isComplete
          isMIA
        }
      }
    }
    enumeration {
      inProgress
      numACPW
      numPVI
    }
    firmwareUpdate {
      isUpdating
      powerwalls {
        updating
        numSteps
        currentStep
        currentStepProgress
        progress
      }
      msa {
        updating
        numSteps
        currentStep
        currentStepProgress
        progress
      }
      sync {
        updating
        numSteps
        currentStep
        currentStepProgress
        progress
      }
      pvInverters {
        updating
        numSteps
        currentStep
        currentStepProgress
        progress
      }
    }
    phaseDetection {
      inProgress
      lastUpdateTimestamp
      powerwalls {
        din
        progress
        phase
      }
    }
    inverterSelfTests {
      isRunning
      isCanceled
      pinvSelfTestsResults {
        din
        overall {
          status
          test
          summary
          setMagnitude
          setTime
          tripMagnitude
          tripTime
          accuracyMagnitude
          accuracyTime
          currentMagnitude
          timestamp
          lastError
        }
        testResults {
          status
          test
          summary
          setMagnitude
          setTime
          tripMagnitude
          tripTime
          accuracyMagnitude
          accuracyTime
          currentMagnitude
          timestamp
          lastError
        }
      }
    }
  }
}
";

/// Precomputed DER-encoded signature accepted by the gateway for
/// [`DEVICE_CONTROLLER_QUERY`]. Status queries always send this long-form
/// constant; the shorter provisioning code harvested from a config response
/// is not a valid substitute here ("Invalid signature format").
pub const STATUS_AUTH_CODE: &[u8] = &[
    0x30, 0x81, 0x86, 0x02, 0x41, 0x14, 0xB1, 0x97, 0xA5, 0x7F, 0xAD, 0xB5, 0xBA, 0xD1, 0x72,
    0x1A, 0xA8, 0xBD, 0x6A, 0xC5, 0x18, 0x98, 0x30, 0xB6, 0x12, 0x42, 0xA2, 0xB4, 0x70, 0x4F,
    0xB2, 0x14, 0x76, 0x64, 0xB7, 0xCE, 0x1A, 0x0C, 0xFE, 0xD2, 0x56, 0x01, 0x0C, 0x7F, 0x2A,
    0xF6, 0xE5, 0xDB, 0x67, 0x5F, 0x2F, 0x60, 0x0B, 0x16, 0x95, 0x5F, 0x71, 0x63, 0x13, 0x24,
    0xD3, 0x8E, 0x79, 0xBE, 0x7E, 0xDD, 0x41, 0x31, 0x12, 0x78, 0x02, 0x41, 0x70, 0x07, 0x5F,
    0xB4, 0x1F, 0x5D, 0xC4, 0x3E, 0xF2, 0xEE, 0x05, 0xA5, 0x56, 0xC1, 0x7F, 0x2A, 0x08, 0xC7,
    0x0E, 0xA6, 0x5D, 0x1F, 0x82, 0xA2, 0xEB, 0x49, 0x7E, 0xDA, 0xCF, 0x11, 0xDE, 0x06, 0x1B,
    0x71, 0xCF, 0xC9, 0xB4, 0xCD, 0xFC, 0x1E, 0xF5, 0x73, 0xBA, 0x95, 0x8D, 0x23, 0x6F, 0x21,
    0xCD, 0x7A, 0xEB, 0xE5, 0x7A, 0x96, 0xF5, 0xE1, 0x0C, 0xB5, 0xAE, 0x72, 0xFB, 0xCB, 0x2F,
    0x17, 0x1F,
];
